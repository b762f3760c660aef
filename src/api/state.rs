//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use crate::analysis::CorrelationEngine;
use crate::journal::EntryStore;
use crate::sync::{RequestOutcome, SyncScheduler, SyncTrigger};
use std::sync::Arc;
use std::time::Instant;

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// Journal entry store
    pub store: Arc<EntryStore>,
    /// Correlation engine reading from the same store
    pub engine: Arc<CorrelationEngine>,
    /// Background sync queue (absent when sync is not configured)
    pub scheduler: Option<Arc<SyncScheduler>>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
}

impl AppState {
    /// Create a new AppState without sync
    pub fn new(store: Arc<EntryStore>, engine: Arc<CorrelationEngine>) -> Self {
        Self {
            store,
            engine,
            scheduler: None,
            start_time: Instant::now(),
        }
    }

    /// Attach a running sync scheduler
    pub fn with_sync(mut self, scheduler: Arc<SyncScheduler>) -> Self {
        self.scheduler = Some(scheduler);
        self
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn sync_enabled(&self) -> bool {
        self.scheduler
            .as_ref()
            .map(|s| s.manager().is_enabled())
            .unwrap_or(false)
    }

    /// Queue a sync after a local save, if sync is running
    pub fn request_sync(&self, trigger: SyncTrigger) -> Option<RequestOutcome> {
        self.scheduler
            .as_ref()
            .filter(|s| s.manager().is_enabled())
            .map(|s| s.request(trigger))
    }
}
