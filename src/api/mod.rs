//! Flaretrack REST API
//!
//! HTTP API layer used by presentation clients, built with Axum.
//!
//! # Endpoints
//!
//! ## Entries
//! - `GET /api/v1/entries?start&end` - List live entries
//! - `GET /api/v1/entries/:date` - Get one day
//! - `PUT /api/v1/entries/:date` - Create or replace a day
//! - `DELETE /api/v1/entries/:date` - Delete a day
//! - `GET /api/v1/foods` - Food and contact suggestions
//!
//! ## Analysis
//! - `GET /api/v1/analysis?window_days&flare_threshold&include_disabled`
//! - `GET /api/v1/analysis/bands` - Band thresholds and colors
//! - `GET /api/v1/summary?days` - Journal statistics
//!
//! ## Export
//! - `GET /api/v1/export?start&end` - CSV export
//!
//! ## Sync
//! - `POST /api/v1/sync` - Queue a manual sync
//! - `GET /api/v1/sync/status` - Get sync status
//!
//! ## Health
//! - `GET /health/live` - Liveness probe
//! - `GET /health` - Full health status

pub mod dto;
pub mod error;
pub mod routes;
pub mod state;

pub use error::{ApiError, ApiResult};
pub use state::AppState;

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;

/// Build the API router with all routes and middleware
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        // Entry routes
        .route("/entries", get(routes::entries::list_entries))
        .route(
            "/entries/:date",
            get(routes::entries::get_entry)
                .put(routes::entries::put_entry)
                .delete(routes::entries::delete_entry),
        )
        .route("/foods", get(routes::entries::list_suggestions))
        // Analysis routes
        .route("/analysis", get(routes::analysis::get_analysis))
        .route("/analysis/bands", get(routes::analysis::get_bands))
        .route("/summary", get(routes::analysis::get_summary))
        .route("/patterns", get(routes::analysis::get_patterns))
        .route(
            "/patterns/compare",
            get(routes::analysis::get_period_comparison),
        )
        // Export routes
        .route("/export", get(routes::export::export_entries))
        // Sync routes
        .route("/sync", post(routes::sync::trigger_sync))
        .route("/sync/status", get(routes::sync::get_sync_status));

    let health_routes = Router::new()
        .route("/live", get(routes::health::liveness))
        .route("/", get(routes::health::full_health));

    let shared_state = Arc::new(state);

    Router::new()
        .nest("/api/v1", api_routes)
        .nest("/health", health_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(shared_state)
}

/// Start the API server and run until a shutdown signal arrives
pub async fn serve(state: AppState, config: &ApiConfig) -> Result<(), ApiError> {
    let router = build_router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Flaretrack API listening on {}", addr);

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| ApiError::Internal(format!("Server error: {}", e)))?;

    tracing::info!("Flaretrack API shut down gracefully");
    Ok(())
}

/// Wait for shutdown signal
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
