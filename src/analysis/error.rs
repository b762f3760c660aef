//! Analysis error types

use thiserror::Error;

/// Errors returned by the correlation engine
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    /// A tunable was outside its allowed range
    #[error("Invalid parameter {name}={value}: must be between {min} and {max}")]
    InvalidParameter {
        name: &'static str,
        value: i64,
        min: i64,
        max: i64,
    },
}

/// Result type alias for analysis operations
pub type AnalysisResult<T> = Result<T, AnalysisError>;
