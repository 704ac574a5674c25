//! Litchi Builder - composition of WordprocessingML documents
//!
//! Builds one Word package out of content ranges taken from several others,
//! carrying along everything the copied content depends on.
//!
//! # Features
//!
//! - **Range selection**: any window of body-level blocks from each source
//! - **Style reconciliation**: by name or by id, with chained styles followed
//! - **Numbering**: definitions shared by `w:nsid`, instances always fresh
//! - **Related parts**: images, charts, diagrams, embeddings, headers and footers
//! - **Notes and comments**: merged with renumbered ids
//! - **Insertion points**: content can replace `pt:Insert` placeholders in a template
//! - **Glossary documents**: building blocks composed alongside the body
//!
//! # Example
//!
//! ```no_run
//! use litchi_builder::ooxml::docx::{BuilderOptions, DocumentBuilder, Package, Source};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! # fn load(_: &str) -> Package { Package::new_document() }
//! let cover = load("cover.docx");
//! let report = load("report.docx");
//!
//! let builder = DocumentBuilder::new(BuilderOptions::default());
//! let merged = builder.build(&[
//!     Source::new(&cover).with_keep_sections(true),
//!     // Skip the report's own title page
//!     Source::new(&report).with_start(2),
//! ])?;
//!
//! for part in merged.opc_package().iter_parts() {
//!     println!("{}", part.partname());
//! }
//! # Ok(())
//! # }
//! ```

/// Helpers shared by the package and markup layers.
pub mod common;

/// OOXML packages and the document composition engine.
pub mod ooxml;

pub use ooxml::docx::{BuilderError, BuilderOptions, DocumentBuilder, Package, Source, StyleMergeMode};
