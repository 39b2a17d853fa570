//! Error types for the sync engine.

use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur during sync operations.
#[derive(Error, Debug)]
pub enum SyncError {
    /// Network or transport error.
    #[error("transport error: {message}")]
    Transport {
        /// Error message.
        message: String,
        /// Whether the operation can be retried.
        retryable: bool,
    },

    /// The remote collaborator explicitly refused a batch.
    #[error("remote rejected batch for unit {unit}: {reason}")]
    RemoteRejection {
        /// Unit whose batch was refused.
        unit: String,
        /// Reason reported by the remote, if any.
        reason: String,
    },

    /// Local record storage failure.
    #[error("storage error: {0}")]
    Storage(#[from] fieldsync_core::CoreError),

    /// Sync state store read or write failure.
    #[error("state store error: {0}")]
    StateStore(String),

    /// A unit's sync did not finish within its deadline.
    #[error("unit {unit} timed out")]
    Timeout {
        /// Unit that timed out.
        unit: String,
    },

    /// A spawned sync task failed to join (panicked or was cancelled).
    #[error("sync task failed: {0}")]
    Task(String),

    /// Unit name not present in the registry.
    #[error("unknown unit: {0}")]
    UnknownUnit(String),
}

impl SyncError {
    /// Creates a retryable transport error.
    pub fn transport_retryable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable transport error.
    pub fn transport_fatal(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates a remote rejection error.
    pub fn rejection(unit: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::RemoteRejection {
            unit: unit.into(),
            reason: reason.into(),
        }
    }

    /// Returns true if this error can be retried.
    pub fn is_retryable(&self) -> bool {
        match self {
            SyncError::Transport { retryable, .. } => *retryable,
            SyncError::Timeout { .. } => true,
            SyncError::RemoteRejection { .. } => true,
            _ => false,
        }
    }
}
