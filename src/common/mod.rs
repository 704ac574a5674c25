//! Common utilities shared across the package and markup layers.

pub mod id;
pub mod xml;
