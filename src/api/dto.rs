//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::analysis::{Band, BandThresholds};
use crate::export::ExportFormat;
use crate::journal::{DayEntry, EntryDraft, TriggerReadings};
use crate::sync::{RequestOutcome, SyncState, SyncTrigger};

// ============================================
// ENTRY DTOs
// ============================================

/// Optional inclusive date range
#[derive(Debug, Default, Deserialize)]
pub struct DateRangeParams {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
}

/// Entry content for PUT /entries/:date (the date comes from the path)
#[derive(Debug, Deserialize)]
pub struct EntryRequest {
    #[serde(default)]
    pub severity: Option<u8>,
    #[serde(default)]
    pub foods: Vec<String>,
    #[serde(default)]
    pub skin_notes: String,
    #[serde(default)]
    pub food_notes: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub triggers: TriggerReadings,
}

impl EntryRequest {
    pub fn into_draft(self, date: NaiveDate) -> EntryDraft {
        EntryDraft {
            date,
            severity: self.severity,
            foods: self.foods,
            skin_notes: self.skin_notes,
            food_notes: self.food_notes,
            notes: self.notes,
            triggers: self.triggers,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EntryListResponse {
    pub total: usize,
    pub entries: Vec<DayEntry>,
}

/// Response to a save
#[derive(Debug, Serialize)]
pub struct SaveResponse {
    pub entry: DayEntry,
    /// What happened to the save-triggered sync request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<RequestOutcome>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    pub date: NaiveDate,
    pub deleted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sync: Option<RequestOutcome>,
}

/// Known identifiers for input suggestions
#[derive(Debug, Serialize)]
pub struct SuggestionsResponse {
    pub foods: Vec<String>,
    pub contacts: Vec<String>,
}

// ============================================
// ANALYSIS DTOs
// ============================================

/// Overrides for one analysis run; missing fields use configured defaults
#[derive(Debug, Default, Deserialize)]
pub struct AnalysisQuery {
    #[serde(default)]
    pub window_days: Option<u32>,
    #[serde(default)]
    pub flare_threshold: Option<u8>,
    #[serde(default)]
    pub include_disabled: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SummaryQuery {
    /// Only summarise the last N days
    #[serde(default)]
    pub days: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct CompareQuery {
    #[serde(default = "default_period_days")]
    pub recent_days: u32,
    #[serde(default = "default_period_days")]
    pub previous_days: u32,
}

fn default_period_days() -> u32 {
    30
}

#[derive(Debug, Serialize)]
pub struct BandInfo {
    pub band: Band,
    pub color: &'static str,
}

#[derive(Debug, Serialize)]
pub struct BandsResponse {
    pub thresholds: BandThresholds,
    pub bands: Vec<BandInfo>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ExportParams {
    #[serde(default)]
    pub start: Option<NaiveDate>,
    #[serde(default)]
    pub end: Option<NaiveDate>,
    #[serde(default)]
    pub format: ExportFormat,
}

// ============================================
// SYNC DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct SyncRequestResponse {
    pub trigger: SyncTrigger,
    pub outcome: RequestOutcome,
}

#[derive(Debug, Serialize)]
pub struct SyncStatusResponse {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transport: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<SyncState>,
}

// ============================================
// HEALTH DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    /// "healthy" or "degraded" (some stored entries could not be loaded)
    pub status: String,
    pub entries: usize,
    pub load_issues: usize,
    pub sync_enabled: bool,
    pub uptime_seconds: u64,
    pub version: String,
}
