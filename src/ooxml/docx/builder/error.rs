/// Error types for document composition.
use crate::ooxml::error::OoxmlError;
use crate::ooxml::opc::error::OpcError;
use thiserror::Error;

/// Result type for document composition.
pub type Result<T> = std::result::Result<T, BuilderError>;

/// Error types for document composition.
///
/// Source-related failures carry the zero-based position of the offending
/// source in the list handed to the builder.
#[derive(Error, Debug)]
pub enum BuilderError {
    /// The source uses a feature the builder refuses to merge
    #[error("Source {index} is unsupported document - {reason}")]
    Unsupported { index: usize, reason: String },

    /// The source is internally inconsistent (dangling reference, missing part)
    #[error("Source {index} is invalid document - {reason}")]
    Invalid { index: usize, reason: String },

    /// No `pt:Insert` placeholder carries the requested id
    #[error("Insertion point '{0}' not found in the target document")]
    InsertPointNotFound(String),

    /// `build` was called with an empty source list
    #[error("No sources to build from")]
    NoSources,

    /// Underlying package error
    #[error("Package error: {0}")]
    Package(#[from] OoxmlError),

    /// Broken builder invariant
    #[error("Internal error: {0}")]
    Internal(String),
}

impl BuilderError {
    pub(crate) fn unsupported<S: Into<String>>(index: usize, reason: S) -> Self {
        BuilderError::Unsupported {
            index,
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid<S: Into<String>>(index: usize, reason: S) -> Self {
        BuilderError::Invalid {
            index,
            reason: reason.into(),
        }
    }

    /// Whether this error signals a bug rather than a problem with the input.
    pub fn is_internal(&self) -> bool {
        matches!(self, BuilderError::Internal(_))
    }

    /// Index of the source that caused the error, if any.
    pub fn source_index(&self) -> Option<usize> {
        match self {
            BuilderError::Unsupported { index, .. } | BuilderError::Invalid { index, .. } => Some(*index),
            _ => None,
        }
    }
}

impl From<OpcError> for BuilderError {
    fn from(err: OpcError) -> Self {
        BuilderError::Package(OoxmlError::Opc(err))
    }
}
