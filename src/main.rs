//! Flaretrack Server
//!
//! Serves the journal API and keeps the journal in sync with the
//! configured remote in the background.
//!
//! Run with: cargo run --bin flaretrack -- [config.toml]
//!
//! Without an argument the config is searched in the standard locations;
//! `FLARETRACK_*` environment variables override it.

use flaretrack::analysis::CorrelationEngine;
use flaretrack::api::{serve, AppState};
use flaretrack::config::Config;
use flaretrack::journal::EntryStore;
use flaretrack::sync::{SyncManager, SyncScheduler, SyncTrigger};
use std::path::PathBuf;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::args().nth(1).map(PathBuf::from) {
        Some(path) => Config::load_with_env(&path)?,
        None => Config::load_default(),
    };

    flaretrack::logging::init(&config.logging)?;

    tracing::info!("Starting Flaretrack v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!("Data directory: {}", config.store.data_dir);

    let store = Arc::new(EntryStore::open(config.store_config()).await?);
    let issues = store.load_issues().await;
    if !issues.is_empty() {
        tracing::warn!(
            rejected = issues.len(),
            "Some stored entries could not be loaded and are kept as-is"
        );
    }

    let engine = Arc::new(CorrelationEngine::new(
        Arc::clone(&store),
        Arc::new(config.triggers.to_trigger_set()),
        config.analysis_params()?,
        config.analysis_options(),
    ));

    let mut state = AppState::new(Arc::clone(&store), engine);

    let scheduler = if config.sync.enabled {
        match config.build_transport() {
            Ok(transport) => {
                let manager = Arc::new(SyncManager::new(
                    Arc::clone(&store),
                    transport,
                    config.sync_config(),
                ));
                let scheduler = Arc::new(SyncScheduler::start(manager));
                scheduler.request(SyncTrigger::Startup);
                state = state.with_sync(Arc::clone(&scheduler));
                Some(scheduler)
            }
            Err(e) => {
                tracing::error!(error = %e, "Sync disabled: invalid sync configuration");
                None
            }
        }
    } else {
        tracing::info!("Sync disabled (set [sync] enabled = true to enable)");
        None
    };

    serve(state, &config.api).await?;

    if let Some(scheduler) = scheduler {
        tracing::info!("Stopping background sync...");
        scheduler.shutdown().await;
    }

    tracing::info!("Flaretrack stopped");
    Ok(())
}
