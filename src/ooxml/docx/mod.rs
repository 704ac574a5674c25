//! WordprocessingML (.docx) packages and document composition.
//!
//! [`Package`] wraps an OPC package whose main part is a Word document, and the
//! [`builder`] module assembles new packages out of ranges of existing ones.
pub mod builder;
pub mod package;

pub use builder::{BuilderError, BuilderOptions, DocumentBuilder, Source, StyleMergeMode};
pub use package::Package;
