//! Analysis Routes
//!
//! - GET /api/v1/analysis - Trigger correlation report
//! - GET /api/v1/analysis/bands - Fixed band thresholds and colors
//! - GET /api/v1/summary - Journal statistics
//! - GET /api/v1/patterns - Per-factor severity breakdowns
//! - GET /api/v1/patterns/compare - Recent period against the one before

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::Local;
use std::sync::Arc;

use crate::analysis::{
    compare_periods, detect_patterns, summarize, AnalysisParams, Band, CorrelationReport,
    JournalSummary, PatternReport, PeriodComparison,
};
use crate::api::dto::{AnalysisQuery, BandInfo, BandsResponse, CompareQuery, SummaryQuery};
use crate::api::error::ApiResult;
use crate::api::state::AppState;

/// GET /api/v1/analysis
///
/// Window and threshold default to the configured values. Out-of-range
/// values are rejected with 400 rather than clamped.
pub async fn get_analysis(
    State(state): State<Arc<AppState>>,
    Query(query): Query<AnalysisQuery>,
) -> ApiResult<Json<CorrelationReport>> {
    let defaults = state.engine.defaults();
    let params = AnalysisParams::new(
        query.window_days.unwrap_or(defaults.window_days()),
        query.flare_threshold.unwrap_or(defaults.flare_threshold()),
    )?;

    let mut options = state.engine.options();
    if let Some(include_disabled) = query.include_disabled {
        options.include_disabled = include_disabled;
    }

    let report = state.engine.analyze_with(params, options).await?;
    Ok(Json(report))
}

/// GET /api/v1/analysis/bands
pub async fn get_bands(State(state): State<Arc<AppState>>) -> Json<BandsResponse> {
    Json(BandsResponse {
        thresholds: state.engine.band_thresholds(),
        bands: Band::all()
            .iter()
            .map(|&band| BandInfo {
                band,
                color: band.color(),
            })
            .collect(),
    })
}

/// GET /api/v1/summary
pub async fn get_summary(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Json<JournalSummary> {
    let entries = match query.days {
        Some(days) => state.store.recent(days, Local::now().date_naive()).await,
        None => state.store.entries().await,
    };
    Json(summarize(&entries))
}

/// GET /api/v1/patterns
pub async fn get_patterns(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SummaryQuery>,
) -> Json<PatternReport> {
    let entries = match query.days {
        Some(days) => state.store.recent(days, Local::now().date_naive()).await,
        None => state.store.entries().await,
    };
    Json(detect_patterns(&entries))
}

/// GET /api/v1/patterns/compare
pub async fn get_period_comparison(
    State(state): State<Arc<AppState>>,
    Query(query): Query<CompareQuery>,
) -> Json<PeriodComparison> {
    let entries = state.store.entries().await;
    Json(compare_periods(
        &entries,
        Local::now().date_naive(),
        query.recent_days,
        query.previous_days,
    ))
}
