/// XML text helpers shared by the package and markup layers.
mod escape;

pub use escape::{escape_attr, escape_text, resolve_entity};
