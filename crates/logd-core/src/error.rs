//! Error types for the log buffer.

use thiserror::Error;

use crate::types::ReaderId;

/// Errors reported by the log buffer.
///
/// Rejected records are not errors: [`LogBuffer::insert`](crate::LogBuffer::insert)
/// reports them by storing zero bytes.
#[derive(Debug, Error)]
pub enum LogError {
    /// A required record field was not provided.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The reader identifier is unknown (never opened or already closed).
    #[error("reader not registered: {0}")]
    ReaderNotRegistered(ReaderId),

    /// The log type is out of range.
    #[error("invalid log type: {0}")]
    InvalidCategory(u16),

    /// A quota outside the configured bounds was requested.
    #[error("invalid quota {size}: must be within [{min}, {max}]")]
    InvalidQuota {
        /// Requested size in bytes.
        size: usize,
        /// Lower bound in bytes.
        min: usize,
        /// Upper bound in bytes.
        max: usize,
    },

    /// Invalid filter configuration.
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Invalid buffer configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for log buffer operations.
pub type Result<T> = std::result::Result<T, LogError>;
