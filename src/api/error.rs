//! API Error Types
//!
//! Defines error types for the API layer and implements conversion
//! to HTTP responses with appropriate status codes.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::analysis::AnalysisError;
use crate::export::ExportError;
use crate::journal::JournalError;

/// API error types
#[derive(Error, Debug)]
pub enum ApiError {
    /// Request validation failed
    #[error("Validation error: {0}")]
    Validation(String),

    /// Analysis parameter out of range
    #[error("{0}")]
    Analysis(#[from] AnalysisError),

    /// Entry store error
    #[error("{0}")]
    Journal(#[from] JournalError),

    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),

    /// Service unavailable (sync not configured or stopped)
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Error response body
#[derive(Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
    pub request_id: String,
}

/// Error details
#[derive(Serialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<String>,
}

impl ApiError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            ApiError::Analysis(_) => (StatusCode::BAD_REQUEST, "INVALID_PARAMETER"),
            ApiError::Journal(e) => match e {
                JournalError::InvalidEntry { .. } => {
                    (StatusCode::UNPROCESSABLE_ENTITY, "INVALID_ENTRY")
                }
                JournalError::NotFound(_) => (StatusCode::NOT_FOUND, "ENTRY_NOT_FOUND"),
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "STORAGE_ERROR"),
            },
            ApiError::Export(_) => (StatusCode::INTERNAL_SERVER_ERROR, "EXPORT_ERROR"),
            ApiError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
            ApiError::ServiceUnavailable(_) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE")
            }
            ApiError::Io(_) => (StatusCode::INTERNAL_SERVER_ERROR, "IO_ERROR"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let request_id = uuid::Uuid::new_v4().to_string();

        if status.is_server_error() {
            tracing::error!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "API error occurred"
            );
        } else {
            tracing::debug!(
                request_id = %request_id,
                error_code = %code,
                error_message = %self,
                "Request rejected"
            );
        }

        let details = match &self {
            ApiError::Journal(JournalError::InvalidEntry { reasons, .. }) => reasons.clone(),
            _ => Vec::new(),
        };

        let body = ErrorResponse {
            error: ErrorBody {
                code: code.to_string(),
                message: self.to_string(),
                details,
            },
            request_id,
        };

        (status, Json(body)).into_response()
    }
}

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_status_mapping() {
        let invalid = ApiError::from(JournalError::InvalidEntry {
            date: "2026-03-01".into(),
            reasons: vec!["severity 9 out of range 1-5".into()],
        });
        assert_eq!(invalid.status_and_code().0, StatusCode::UNPROCESSABLE_ENTITY);

        let missing = ApiError::from(JournalError::NotFound(
            NaiveDate::from_ymd_opt(2026, 3, 1).unwrap(),
        ));
        assert_eq!(
            missing.status_and_code(),
            (StatusCode::NOT_FOUND, "ENTRY_NOT_FOUND")
        );

        let param = ApiError::from(AnalysisError::InvalidParameter {
            name: "window_days",
            value: 9,
            min: 1,
            max: 5,
        });
        assert_eq!(param.status_and_code(), (StatusCode::BAD_REQUEST, "INVALID_PARAMETER"));
    }
}
