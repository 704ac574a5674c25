//! Document composition: build one WordprocessingML package out of ranges of
//! others.
//!
//! Every source range is merged in its own step. A step carries along the
//! styles, numbering, notes, comments and related parts (images, charts,
//! headers, footers, ...) the range refers to, and rewrites every id the range
//! uses so that nothing collides with what the target already holds:
//!
//! - styles are matched by name, numbering definitions by `w:nsid`, images by
//!   content;
//! - relationship, numbering, bookmark, comment, note and drawing ids are
//!   allocated fresh;
//! - ranges (bookmarks, comments, permissions, tracked moves) cut in half by
//!   the source window are completed or dropped.
//!
//! Sources are validated up front; one unsupported source fails the build
//! before anything is composed.
//!
//! # Examples
//!
//! ```rust,no_run
//! use litchi_builder::ooxml::docx::Package;
//! use litchi_builder::ooxml::docx::builder::{BuilderOptions, DocumentBuilder, Source, StyleMergeMode};
//!
//! # fn load(_: &str) -> Package { Package::new_document() }
//! let template = load("letterhead.dotx");
//! let letter = load("letter.docx");
//! let signature = load("signature.docx");
//!
//! let options = BuilderOptions::new().with_style_merge(StyleMergeMode::ByName);
//! let merged = DocumentBuilder::new(options).build_into(
//!     &template,
//!     &[
//!         Source::new(&letter).with_insert_id("Body"),
//!         Source::new(&signature).with_range(0, 3).with_keep_sections(false),
//!     ],
//! )?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
mod comments;
mod compose;
mod drawing;
mod error;
mod glossary;
mod ids;
mod images;
mod notes;
mod numbering;
mod options;
mod ranges;
mod relationships;
mod sections;
mod source;
mod step;
mod styles;
mod validate;

#[cfg(test)]
mod fixtures;

pub use compose::DocumentBuilder;
pub use error::{BuilderError, Result};
pub use options::{BuilderOptions, StyleMergeMode};
pub use source::Source;
