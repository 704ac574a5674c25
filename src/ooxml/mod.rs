//! Office Open XML packages as editable trees.
//!
//! Three layers:
//!
//! 1. **OPC** (`opc`): parts, relationships and content types held in memory
//! 2. **XML** (`xml`): namespace-resolved element trees for part content
//! 3. **WordprocessingML** (`docx`): the document package and the composition
//!    engine that merges ranges of several packages into one
//!
//! Reading and writing the zip container is left to the caller; packages are
//! assembled from and flattened into parts.
//!
//! # Example
//!
//! ```rust,no_run
//! use litchi_builder::ooxml::docx::{BuilderOptions, DocumentBuilder, Package, Source};
//!
//! # fn load(_: &str) -> Package { Package::new_document() }
//! let first = load("a.docx");
//! let second = load("b.docx");
//! let merged = DocumentBuilder::new(BuilderOptions::default())
//!     .build(&[Source::new(&first), Source::new(&second)])?;
//! println!("main part: {}", merged.main_partname()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
pub mod docx;
pub mod error;
pub mod opc;
pub mod xml;

pub use opc::{OpcPackage, PackURI};
