//! Error types for the column codec.
//!
//! Two levels:
//! - [`ValueError`]: a single primitive value could not be encoded or decoded.
//!   Carries no location.
//! - [`CodecError`]: a record-level failure, located by the dotted qualifier
//!   path where it happened.
//!
//! Storage and CLI layers wrap these in `anyhow::Error`.

use std::string::FromUtf8Error;

use thiserror::Error;

/// Convenience alias used throughout the codec.
pub type Result<T, E = CodecError> = std::result::Result<T, E>;

/// Failure to encode or decode one primitive value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueError {
    /// A fixed-width value was stored with the wrong number of bytes.
    #[error("expected {expected} bytes, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    /// A variable-width value is shorter than its fixed header.
    #[error("value truncated: need at least {minimum} bytes, got {actual}")]
    Truncated { minimum: usize, actual: usize },

    #[error("invalid utf-8 text: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// The value handed to an encoder is not of the codec's type.
    #[error("expected {expected} value, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

/// Record-level codec failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Decode found no stored value and no declared default.
    #[error("required column not found: {qualifier}")]
    MissingRequiredField { qualifier: String },

    /// A stored cell could not be decoded by the field's codec.
    #[error("malformed cell value at {qualifier}: {source}")]
    MalformedCellValue { qualifier: String, source: ValueError },

    /// A value does not have the shape the schema declares.
    #[error("schema mismatch at {qualifier}: {reason}")]
    SchemaMismatch { qualifier: String, reason: String },

    /// Column list handed to the index is not strictly ascending.
    #[error("columns not sorted by qualifier at position {position}")]
    UnsortedColumns { position: usize },

    #[error("invalid schema: {0}")]
    InvalidSchema(String),
}

impl CodecError {
    pub(crate) fn missing(qualifier: impl Into<String>) -> Self {
        CodecError::MissingRequiredField {
            qualifier: qualifier.into(),
        }
    }

    pub(crate) fn malformed(qualifier: impl Into<String>, source: ValueError) -> Self {
        CodecError::MalformedCellValue {
            qualifier: qualifier.into(),
            source,
        }
    }

    pub(crate) fn mismatch(qualifier: impl Into<String>, reason: impl Into<String>) -> Self {
        CodecError::SchemaMismatch {
            qualifier: qualifier.into(),
            reason: reason.into(),
        }
    }

    /// The dotted qualifier this error is attached to, if any.
    pub fn qualifier(&self) -> Option<&str> {
        match self {
            CodecError::MissingRequiredField { qualifier }
            | CodecError::MalformedCellValue { qualifier, .. }
            | CodecError::SchemaMismatch { qualifier, .. } => Some(qualifier),
            CodecError::UnsortedColumns { .. } | CodecError::InvalidSchema(_) => None,
        }
    }
}
