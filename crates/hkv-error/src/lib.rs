//! Error taxonomy for the hkv index-row engine.
//!
//! Every error raised by this workspace is a deterministic, non-retryable
//! contract violation: the core performs no I/O and has no partial or
//! idempotent operations to retry. Callers (the scan/operator layer) decide
//! whether a failure aborts the enclosing transaction; nothing here is
//! silently repaired.

use thiserror::Error;

/// Primary error type for hkv operations.
///
/// Structured variants for the four failure classes of the physical data
/// model. All of them indicate either a caller/schema bug or on-disk
/// corruption, never a transient condition.
#[derive(Error, Debug)]
pub enum HkvError {
    /// A field or position outside the bound index's declared column count,
    /// or an ancestor table that is not on this index's hierarchy path.
    /// Indicates a caller or schema bug.
    #[error("index shape mismatch: {detail}")]
    ShapeMismatch { detail: String },

    /// Encoded bytes are shorter or otherwise malformed relative to what the
    /// projection program or decoder expects. Surfaced as a storage-layer
    /// consistency error.
    #[error("index corrupted: {detail}")]
    Corrupt { detail: String },

    /// An operation the bound row kind does not support, e.g. requesting a
    /// table bitmap from a table-index row.
    #[error("unsupported operation: {detail}")]
    Unsupported { detail: String },

    /// A malformed group or index definition rejected at schema load.
    #[error("invalid definition: {detail}")]
    InvalidDefinition { detail: String },
}

impl HkvError {
    /// Shorthand for [`HkvError::ShapeMismatch`].
    pub fn shape(detail: impl Into<String>) -> Self {
        Self::ShapeMismatch {
            detail: detail.into(),
        }
    }

    /// Shorthand for [`HkvError::Corrupt`].
    pub fn corrupt(detail: impl Into<String>) -> Self {
        Self::Corrupt {
            detail: detail.into(),
        }
    }

    /// Shorthand for [`HkvError::Unsupported`].
    pub fn unsupported(detail: impl Into<String>) -> Self {
        Self::Unsupported {
            detail: detail.into(),
        }
    }

    /// Shorthand for [`HkvError::InvalidDefinition`].
    pub fn definition(detail: impl Into<String>) -> Self {
        Self::InvalidDefinition {
            detail: detail.into(),
        }
    }
}

/// Result alias used throughout the workspace.
pub type Result<T> = std::result::Result<T, HkvError>;
