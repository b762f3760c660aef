//! Journal error types
//!
//! Defines all errors that can occur in the entry store.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur in the entry store
#[derive(Error, Debug)]
pub enum JournalError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// The journal file is not a JSON object keyed by date
    #[error("Corrupt journal: {0}")]
    Corrupt(String),

    /// An entry failed validation and was not written
    #[error("Invalid entry for {date}: {}", .reasons.join("; "))]
    InvalidEntry { date: String, reasons: Vec<String> },

    /// No live entry exists for the date
    #[error("No entry for {0}")]
    NotFound(NaiveDate),
}

impl From<serde_json::Error> for JournalError {
    fn from(err: serde_json::Error) -> Self {
        JournalError::Serialization(err.to_string())
    }
}

/// Result type alias for journal operations
pub type JournalResult<T> = Result<T, JournalError>;

/// A stored or supplied record that was skipped because it could not be
/// decoded or failed validation
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntryIssue {
    /// The record key (normally a `YYYY-MM-DD` date)
    pub key: String,
    pub reason: String,
}

impl EntryIssue {
    pub fn new(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            reason: reason.into(),
        }
    }
}

impl std::fmt::Display for EntryIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.key, self.reason)
    }
}
