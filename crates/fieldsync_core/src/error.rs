//! Error types for FieldSync core.

use crate::types::RecordId;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in record storage operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage backend failure (read or write).
    #[error("storage error: {0}")]
    Storage(String),

    /// Record not found in the store.
    #[error("record not found: {0}")]
    RecordNotFound(RecordId),

    /// Record payload could not be decoded.
    #[error("invalid record payload: {0}")]
    InvalidPayload(String),
}

impl CoreError {
    /// Creates a storage error from any message.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage(message.into())
    }
}
