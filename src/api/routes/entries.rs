//! Entry Routes
//!
//! Read and write journal days.
//!
//! - GET /api/v1/entries?start&end - List live entries
//! - GET /api/v1/entries/:date - Get one day
//! - PUT /api/v1/entries/:date - Create or replace a day
//! - DELETE /api/v1/entries/:date - Delete a day
//! - GET /api/v1/foods - Known food and contact identifiers
//!
//! Saves and deletes queue a sync when sync is running.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use std::sync::Arc;

use crate::api::dto::{
    DateRangeParams, DeleteResponse, EntryListResponse, EntryRequest, SaveResponse,
    SuggestionsResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::journal::validation::earliest_date;
use crate::journal::{DayEntry, JournalError};
use crate::sync::SyncTrigger;

/// GET /api/v1/entries
///
/// Without a range, returns every live entry in date order.
pub async fn list_entries(
    State(state): State<Arc<AppState>>,
    Query(params): Query<DateRangeParams>,
) -> ApiResult<Json<EntryListResponse>> {
    let entries = match (params.start, params.end) {
        (None, None) => state.store.entries().await,
        (start, end) => {
            let start = start.unwrap_or_else(earliest_date);
            let end = end.unwrap_or(NaiveDate::MAX);
            if start > end {
                return Err(ApiError::Validation(
                    "start must not be after end".to_string(),
                ));
            }
            state.store.range(start, end).await
        }
    };

    Ok(Json(EntryListResponse {
        total: entries.len(),
        entries,
    }))
}

/// GET /api/v1/entries/:date
pub async fn get_entry(
    State(state): State<Arc<AppState>>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<DayEntry>> {
    let entry = state
        .store
        .get(date)
        .await
        .ok_or(JournalError::NotFound(date))?;
    Ok(Json(entry))
}

/// PUT /api/v1/entries/:date
///
/// Sanitises and validates the content; rejected entries return 422 with
/// the list of reasons.
pub async fn put_entry(
    State(state): State<Arc<AppState>>,
    Path(date): Path<NaiveDate>,
    Json(req): Json<EntryRequest>,
) -> ApiResult<Json<SaveResponse>> {
    let entry = state.store.upsert(req.into_draft(date)).await?;
    tracing::info!(date = %date, severity = ?entry.severity, "Entry saved");

    let sync = state.request_sync(SyncTrigger::LocalSave);
    Ok(Json(SaveResponse { entry, sync }))
}

/// DELETE /api/v1/entries/:date
pub async fn delete_entry(
    State(state): State<Arc<AppState>>,
    Path(date): Path<NaiveDate>,
) -> ApiResult<Json<DeleteResponse>> {
    if !state.store.delete(date).await? {
        return Err(JournalError::NotFound(date).into());
    }
    tracing::info!(date = %date, "Entry deleted");

    let sync = state.request_sync(SyncTrigger::LocalSave);
    Ok(Json(DeleteResponse {
        date,
        deleted: true,
        sync,
    }))
}

/// GET /api/v1/foods
pub async fn list_suggestions(State(state): State<Arc<AppState>>) -> Json<SuggestionsResponse> {
    Json(SuggestionsResponse {
        foods: state.store.all_foods().await,
        contacts: state.store.all_contacts().await,
    })
}
