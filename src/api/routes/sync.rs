//! Sync Routes
//!
//! Endpoints for multi-device synchronization.
//!
//! - POST /api/v1/sync - Queue a manual sync
//! - GET /api/v1/sync/status - Get sync status

use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;

use crate::api::dto::{SyncRequestResponse, SyncStatusResponse};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::sync::{RequestOutcome, SyncTrigger};

/// POST /api/v1/sync
///
/// Queues a cycle and returns immediately; poll the status endpoint for
/// the result.
pub async fn trigger_sync(
    State(state): State<Arc<AppState>>,
) -> ApiResult<(StatusCode, Json<SyncRequestResponse>)> {
    let scheduler = state
        .scheduler
        .as_ref()
        .ok_or_else(|| ApiError::ServiceUnavailable("Sync is not configured".to_string()))?;

    if !scheduler.manager().is_enabled() {
        return Err(ApiError::ServiceUnavailable("Sync is disabled".to_string()));
    }

    let outcome = scheduler.request(SyncTrigger::Manual);
    if outcome == RequestOutcome::Stopped {
        return Err(ApiError::ServiceUnavailable(
            "Sync scheduler has stopped".to_string(),
        ));
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(SyncRequestResponse {
            trigger: SyncTrigger::Manual,
            outcome,
        }),
    ))
}

/// GET /api/v1/sync/status
///
/// Current phase, last result and the store's last-synced marker.
pub async fn get_sync_status(State(state): State<Arc<AppState>>) -> Json<SyncStatusResponse> {
    match &state.scheduler {
        Some(scheduler) => {
            let manager = scheduler.manager();
            Json(SyncStatusResponse {
                enabled: manager.is_enabled(),
                transport: Some(manager.transport_name().to_string()),
                state: Some(manager.status().await),
            })
        }
        None => Json(SyncStatusResponse {
            enabled: false,
            transport: None,
            state: None,
        }),
    }
}
