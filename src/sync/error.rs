//! Sync error types

use crate::journal::error::JournalError;
use thiserror::Error;

/// Failures talking to the remote store
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("Request timeout")]
    Timeout,

    #[error("Remote unavailable: {0}")]
    Unavailable(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that end a sync cycle
#[derive(Error, Debug)]
pub enum SyncError {
    /// Remote unreachable or failing; retried on the next cycle
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// The remote snapshot could not be decoded
    #[error("Remote snapshot rejected: {0}")]
    Data(String),

    /// The merged result could not be written locally
    #[error("Local store error: {0}")]
    Store(#[from] JournalError),

    #[error("Sync cancelled")]
    Cancelled,

    #[error("Sync is disabled")]
    Disabled,
}

impl SyncError {
    /// Whether the next scheduled cycle may succeed without intervention.
    /// A cancel is a deliberate stop and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, SyncError::Transport(_) | SyncError::Store(_))
    }
}

/// Result type alias for sync operations
pub type SyncResult<T> = Result<T, SyncError>;
