/// Open Packaging Conventions (OPC) implementation.
///
/// This module provides the in-memory side of the OPC specification, which defines
/// the structure of Office Open XML documents:
///
/// - Package structure (parts, relationships)
/// - Content type management
/// - Part naming and relative references
///
/// The physical zip container is handled outside this crate.
pub mod constants;
pub mod error;
pub mod package;
pub mod packuri;
pub mod part;
pub mod rel;

// Re-export commonly used types
pub use package::OpcPackage;
pub use packuri::PackURI;
pub use part::{BlobPart, Part, PartFactory, XmlPart};
pub use rel::{Relationship, Relationships};
