//! # Flaretrack
//!
//! Skin-condition journal with trigger correlation analysis and
//! multi-device sync.
//!
//! ## Features
//!
//! - **Daily journal**: one entry per day with severity, foods and trigger readings
//! - **Trigger analysis**: flare probability per food or condition over a short window
//! - **Sync**: last-writer-wins reconciliation with a shared remote document
//! - **Severity patterns**: per-food averages, nickel load, weather, sleep, stress
//!   and fungal onsets
//! - **REST API**: entries, analysis, export and sync for presentation clients
//!
//! ## Modules
//!
//! - [`journal`]: Entry store, validation and sanitising
//! - [`analysis`]: Correlation engine, journal statistics and severity patterns
//! - [`sync`]: Reconciler, transports, sync manager and scheduler
//! - [`export`]: CSV/JSON export and import
//! - [`api`]: REST API server with Axum
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use flaretrack::analysis::{AnalysisOptions, AnalysisParams, CorrelationEngine, TriggerSet};
//! use flaretrack::journal::{EntryDraft, EntryStore, StoreConfig};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(EntryStore::open(StoreConfig::new("./journal")).await?);
//!
//!     store
//!         .upsert(EntryDraft::new("2026-03-01".parse()?).severity(2).food("Milk"))
//!         .await?;
//!
//!     let engine = CorrelationEngine::new(
//!         Arc::clone(&store),
//!         Arc::new(TriggerSet::all_enabled()),
//!         AnalysisParams::default(),
//!         AnalysisOptions::default(),
//!     );
//!     let report = engine.analyze(2, 4).await?;
//!
//!     for stat in &report.stats {
//!         println!("{}: {:?}", stat.label, stat.band);
//!     }
//!     Ok(())
//! }
//! ```

pub mod analysis;
pub mod api;
pub mod config;
pub mod export;
pub mod journal;
pub mod logging;
pub mod sync;

// Re-export top-level types for convenience
pub use journal::{
    DayEntry, EntryDraft, EntryIssue, EntryStore, JournalError, JournalResult, StoreConfig,
    TriggerReadings, Weather,
};

pub use analysis::{
    analyze, detect_patterns, summarize, AnalysisError, AnalysisOptions, AnalysisParams, Band,
    CorrelationEngine, CorrelationReport, JournalSummary, PatternReport, Probability, TriggerKind,
    TriggerSet, TriggerStat, TriggerValue,
};

pub use export::{ExportFormat, ImportReport};

pub use sync::{
    reconcile, Conflict, FileTransport, HttpTransport, Snapshot, SyncError, SyncManager,
    SyncScheduler, SyncTransport, SyncTrigger,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use config::{Config, ConfigError};
