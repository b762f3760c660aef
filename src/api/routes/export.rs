//! Export Routes
//!
//! Data export endpoint for backup and spreadsheet analysis.
//!
//! - GET /api/v1/export?start&end&format - Export entries as CSV (default) or JSON

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use chrono::{NaiveDate, Utc};
use std::sync::Arc;

use crate::api::dto::ExportParams;
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::export::write_entries;
use crate::journal::validation::earliest_date;

/// GET /api/v1/export
pub async fn export_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ExportParams>,
) -> ApiResult<Response> {
    let start = params.start.unwrap_or_else(earliest_date);
    let end = params.end.unwrap_or(NaiveDate::MAX);
    if start > end {
        return Err(ApiError::Validation(
            "start must not be after end".to_string(),
        ));
    }

    let entries = state.store.range(start, end).await;
    let mut body = Vec::new();
    write_entries(&entries, params.format, &mut body)?;

    let filename = format!(
        "flaretrack_export_{}.{}",
        Utc::now().format("%Y%m%d_%H%M%S"),
        params.format.extension()
    );

    tracing::info!(entries = entries.len(), format = ?params.format, "Exported journal");

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, params.format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{}\"", filename),
            ),
        ],
        Body::from(body),
    )
        .into_response())
}
