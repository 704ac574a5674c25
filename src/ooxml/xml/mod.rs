/// Namespace-resolved XML trees for WordprocessingML parts.
///
/// Parts are parsed once into an [`XmlDocument`], edited as [`Element`] trees and
/// serialized back on demand. Names are compared by namespace URI, never by
/// prefix, so content copied between packages keeps its meaning regardless of
/// how either package spelled its prefixes.
pub mod document;
pub mod element;
pub mod name;

pub use document::XmlDocument;
pub use element::{Attribute, Element, Node};
pub use name::{XName, ns};
