//! Sync Manager
//!
//! Runs one sync cycle at a time through the state machine
//!
//! ```text
//! IDLE -> FETCHING_REMOTE -> MERGING -> PUSHING -> IDLE
//! ```
//!
//! The local store is only written after the push succeeds, so a failure
//! or cancellation in any phase leaves the journal exactly as it was.
//! `last_synced` advances after both writes. A side the merge does not
//! change is not written.

use crate::journal::store::{ApplyStats, EntryStore};
use crate::sync::error::{SyncError, SyncResult, TransportError};
use crate::sync::reconcile::{expired_tombstones, reconcile, Conflict, MergeStats};
use crate::sync::snapshot::{PurgedTombstone, Snapshot};
use crate::sync::transport::SyncTransport;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};

/// Phase of the current sync cycle
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncPhase {
    #[default]
    Idle,
    FetchingRemote,
    Merging,
    Pushing,
}

/// Configuration for sync behavior
#[derive(Debug, Clone)]
pub struct SyncConfig {
    pub enabled: bool,
    /// Periodic sync interval
    pub interval: Duration,
    /// Limit for each transport call
    pub transport_timeout: Duration,
    /// How long converged tombstones are kept
    pub tombstone_retention: chrono::Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval: Duration::from_secs(5 * 60),
            transport_timeout: Duration::from_secs(30),
            tombstone_retention: chrono::Duration::days(90),
        }
    }
}

/// Result of a successful cycle
#[derive(Debug, Clone, Serialize)]
pub struct SyncOutcome {
    pub synced_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub stats: MergeStats,
    pub conflicts: Vec<Conflict>,
    pub purged: Vec<PurgedTombstone>,
    pub applied: ApplyStats,
}

/// Status of the last sync attempt
#[derive(Debug, Clone, Serialize)]
pub struct SyncStatus {
    pub timestamp: DateTime<Utc>,
    pub success: bool,
    pub duration_ms: u64,
    pub conflicts: usize,
    pub error: Option<String>,
    pub retryable: bool,
}

/// Current state of the sync manager
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncState {
    pub phase: SyncPhase,
    pub last_synced: Option<DateTime<Utc>>,
    pub last_status: Option<SyncStatus>,
    pub consecutive_failures: u32,
    pub cycles: u64,
}

/// Reconciles the local store with one remote transport
pub struct SyncManager {
    store: Arc<EntryStore>,
    transport: Arc<dyn SyncTransport>,
    state: RwLock<SyncState>,
    config: SyncConfig,
    /// Held for the whole cycle so cycles never overlap
    cycle: Mutex<()>,
    cancel: watch::Sender<bool>,
}

impl SyncManager {
    /// Create a new sync manager
    pub fn new(store: Arc<EntryStore>, transport: Arc<dyn SyncTransport>, config: SyncConfig) -> Self {
        let (cancel, _) = watch::channel(false);
        Self {
            store,
            transport,
            state: RwLock::new(SyncState::default()),
            config,
            cycle: Mutex::new(()),
            cancel,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    pub fn transport_name(&self) -> &str {
        self.transport.name()
    }

    /// Current phase, history and the store's last-synced marker
    pub async fn status(&self) -> SyncState {
        let mut state = self.state.read().await.clone();
        state.last_synced = self.store.last_synced().await;
        state
    }

    /// Abort the in-flight fetch or push and refuse further cycles
    pub fn cancel(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel.borrow()
    }

    async fn set_phase(&self, phase: SyncPhase) {
        tracing::debug!(phase = ?phase, "Sync phase");
        self.state.write().await.phase = phase;
    }

    /// Run a transport call under the configured timeout, aborting early if
    /// the manager is cancelled
    async fn guarded<T, F>(&self, fut: F) -> SyncResult<T>
    where
        F: Future<Output = Result<T, TransportError>>,
    {
        let mut cancelled = self.cancel.subscribe();
        if *cancelled.borrow() {
            return Err(SyncError::Cancelled);
        }

        tokio::select! {
            result = tokio::time::timeout(self.config.transport_timeout, fut) => match result {
                Ok(inner) => inner.map_err(SyncError::from),
                Err(_) => Err(SyncError::Transport(TransportError::Timeout)),
            },
            _ = cancelled.wait_for(|c| *c) => Err(SyncError::Cancelled),
        }
    }

    /// Perform one sync cycle
    pub async fn sync(&self) -> SyncResult<SyncOutcome> {
        if !self.config.enabled {
            return Err(SyncError::Disabled);
        }

        let _cycle = self.cycle.lock().await;
        let start = std::time::Instant::now();

        let result = self.run_cycle(start).await;
        self.set_phase(SyncPhase::Idle).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let mut state = self.state.write().await;
        state.cycles += 1;

        match &result {
            Ok(outcome) => {
                state.consecutive_failures = 0;
                state.last_status = Some(SyncStatus {
                    timestamp: outcome.synced_at,
                    success: true,
                    duration_ms,
                    conflicts: outcome.conflicts.len(),
                    error: None,
                    retryable: false,
                });
                tracing::info!(
                    transport = self.transport.name(),
                    entries = outcome.stats.total(),
                    updated = outcome.applied.updated,
                    conflicts = outcome.conflicts.len(),
                    duration_ms,
                    "Sync completed"
                );
            }
            Err(e) => {
                state.consecutive_failures += 1;
                state.last_status = Some(SyncStatus {
                    timestamp: Utc::now(),
                    success: false,
                    duration_ms,
                    conflicts: 0,
                    error: Some(e.to_string()),
                    retryable: e.is_retryable(),
                });
                match e {
                    SyncError::Data(_) => {
                        tracing::error!(error = %e, "Sync rejected remote snapshot")
                    }
                    SyncError::Cancelled => tracing::info!("Sync cancelled"),
                    _ => tracing::warn!(
                        error = %e,
                        failures = state.consecutive_failures,
                        "Sync failed, will retry on next cycle"
                    ),
                }
            }
        }

        result
    }

    async fn run_cycle(&self, start: std::time::Instant) -> SyncResult<SyncOutcome> {
        self.set_phase(SyncPhase::FetchingRemote).await;
        let local = self.store.snapshot().await;
        let document = self.guarded(self.transport.fetch()).await?;

        self.set_phase(SyncPhase::Merging).await;
        let remote_exists = document.is_some();
        let remote = match document {
            Some(doc) => Snapshot::from_document(&doc)?,
            None => Snapshot::default(),
        };
        let mut reconciliation = reconcile(&local, &remote);
        let purged = expired_tombstones(
            &local,
            &remote,
            Utc::now(),
            self.config.tombstone_retention,
        );
        reconciliation.merged.remove_purged(&purged);

        for conflict in &reconciliation.conflicts {
            tracing::warn!(
                date = %conflict.date,
                updated_at = %conflict.updated_at,
                "Sync conflict on equal timestamps, kept remote copy"
            );
        }

        if !remote_exists || reconciliation.changes_remote() || !purged.is_empty() {
            self.set_phase(SyncPhase::Pushing).await;
            let merged_document = reconciliation.merged.to_document()?;
            self.guarded(self.transport.push(&merged_document)).await?;
        } else {
            tracing::debug!("Remote already up to date, skipping push");
        }

        let applied = if reconciliation.changes_local() || !purged.is_empty() {
            self.store.apply_merged(&reconciliation.merged, &purged).await?
        } else {
            ApplyStats::default()
        };
        let synced_at = Utc::now();
        self.store.mark_synced(synced_at).await?;

        Ok(SyncOutcome {
            synced_at,
            duration_ms: start.elapsed().as_millis() as u64,
            stats: reconciliation.stats,
            conflicts: reconciliation.conflicts,
            purged,
            applied,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::{DayEntry, EntryDraft, StoreConfig};
    use crate::sync::reconcile::Resolution;
    use crate::sync::transport::testing::MemoryTransport;
    use std::sync::atomic::Ordering;
    use tempfile::{tempdir, TempDir};

    async fn setup(transport: Arc<MemoryTransport>, config: SyncConfig) -> (TempDir, Arc<EntryStore>, SyncManager) {
        let dir = tempdir().unwrap();
        let store = Arc::new(EntryStore::open(StoreConfig::new(dir.path())).await.unwrap());
        let manager = SyncManager::new(store.clone(), transport, config);
        (dir, store, manager)
    }

    fn day(s: &str) -> chrono::NaiveDate {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn test_first_sync_pushes_local() {
        let transport = Arc::new(MemoryTransport::new());
        let (_dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;
        store
            .upsert(EntryDraft::new(day("2026-02-01")).severity(3).food("Milch"))
            .await
            .unwrap();

        let outcome = manager.sync().await.unwrap();
        assert_eq!(outcome.stats.local_only, 1);

        let remote = Snapshot::from_document(&transport.document().unwrap()).unwrap();
        assert_eq!(remote.get(day("2026-02-01")).unwrap().severity, Some(3));

        let status = manager.status().await;
        assert_eq!(status.phase, SyncPhase::Idle);
        assert_eq!(status.last_synced, Some(outcome.synced_at));
        assert!(status.last_status.unwrap().success);
    }

    #[tokio::test]
    async fn test_remote_changes_are_applied_locally() {
        let remote_doc = r#"{
            "2026-02-02": {"date":"2026-02-02","severity":5,"foods":["Käse"],"created_at":"2026-02-02T08:00:00Z","updated_at":"2026-02-02T08:00:00Z"}
        }"#;
        let transport = Arc::new(MemoryTransport::with_document(remote_doc));
        let (_dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;

        let outcome = manager.sync().await.unwrap();
        assert_eq!(outcome.stats.remote_only, 1);
        assert_eq!(outcome.applied.updated, 1);
        assert_eq!(store.get(day("2026-02-02")).await.unwrap().severity, Some(5));
        // Nothing local was missing from the remote
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_unchanged_cycle_writes_nothing() {
        let transport = Arc::new(MemoryTransport::new());
        let (dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;
        store
            .upsert(EntryDraft::new(day("2026-02-01")).severity(3))
            .await
            .unwrap();

        manager.sync().await.unwrap();
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 1);
        let journal = std::fs::read_to_string(dir.path().join("entries.json")).unwrap();

        let outcome = manager.sync().await.unwrap();
        assert_eq!(outcome.stats.identical, 1);
        assert_eq!(outcome.applied, ApplyStats::default());
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 1);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("entries.json")).unwrap(),
            journal
        );
        assert_eq!(store.last_synced().await, Some(outcome.synced_at));
    }

    #[tokio::test]
    async fn test_equal_timestamp_conflict_keeps_remote_copy() {
        let transport = Arc::new(MemoryTransport::new());
        let (_dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;
        let local = store
            .upsert(EntryDraft::new(day("2026-02-04")).severity(2).food("Reis"))
            .await
            .unwrap();

        // Another device saved different content at the same instant
        let remote_copy = DayEntry {
            severity: Some(5),
            foods: ["Käse".to_string()].into_iter().collect(),
            ..local.clone()
        };
        let remote = Snapshot::from_entries([remote_copy.clone()]);
        transport.set_document(remote.to_document().unwrap());

        let outcome = manager.sync().await.unwrap();
        assert_eq!(outcome.stats.conflicts, 1);
        assert_eq!(outcome.conflicts.len(), 1);
        let conflict = &outcome.conflicts[0];
        assert_eq!(conflict.date, day("2026-02-04"));
        assert_eq!(conflict.updated_at, local.updated_at);
        assert_eq!(conflict.resolution, Resolution::RemotePreferred);
        assert!(!conflict.local_deleted && !conflict.remote_deleted);

        assert_eq!(outcome.applied.updated, 1);
        assert_eq!(store.get(day("2026-02-04")).await, Some(remote_copy));
        assert_eq!(
            manager.status().await.last_status.unwrap().conflicts,
            1
        );

        // The remote already held the winner
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_local_untouched() {
        let transport = Arc::new(MemoryTransport::with_document("{}"));
        transport.fail_fetch.store(true, Ordering::SeqCst);
        let (_dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;
        store
            .upsert(EntryDraft::new(day("2026-02-01")).severity(2))
            .await
            .unwrap();
        let before = store.snapshot().await;

        let err = manager.sync().await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(store.snapshot().await, before);
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);

        let status = manager.status().await;
        assert_eq!(status.consecutive_failures, 1);
        assert_eq!(status.phase, SyncPhase::Idle);
        assert!(status.last_synced.is_none());

        // Next cycle recovers
        transport.fail_fetch.store(false, Ordering::SeqCst);
        manager.sync().await.unwrap();
        assert_eq!(manager.status().await.consecutive_failures, 0);
    }

    #[tokio::test]
    async fn test_push_failure_does_not_commit_merge() {
        let remote_doc = r#"{
            "2026-02-02": {"date":"2026-02-02","severity":5,"created_at":"2026-02-02T08:00:00Z","updated_at":"2026-02-02T08:00:00Z"}
        }"#;
        let transport = Arc::new(MemoryTransport::with_document(remote_doc));
        transport.fail_push.store(true, Ordering::SeqCst);
        let (_dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;
        store
            .upsert(EntryDraft::new(day("2026-02-01")).severity(2))
            .await
            .unwrap();

        let err = manager.sync().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(_)));
        assert!(store.get(day("2026-02-02")).await.is_none());
        assert!(store.last_synced().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_remote_is_data_error() {
        let transport = Arc::new(MemoryTransport::with_document("{\"2026-02-01\": 42}"));
        let (_dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;
        store
            .upsert(EntryDraft::new(day("2026-02-01")).severity(2))
            .await
            .unwrap();

        let err = manager.sync().await.unwrap_err();
        assert!(matches!(err, SyncError::Data(_)));
        assert!(!err.is_retryable());
        assert_eq!(transport.pushes.load(Ordering::SeqCst), 0);
        assert_eq!(store.get(day("2026-02-01")).await.unwrap().severity, Some(2));
        assert!(!manager.status().await.last_status.unwrap().retryable);
    }

    #[tokio::test]
    async fn test_timeout_is_retryable() {
        let transport = Arc::new(MemoryTransport::new());
        transport.set_delay(Duration::from_millis(500));
        let config = SyncConfig {
            transport_timeout: Duration::from_millis(20),
            ..Default::default()
        };
        let (_dir, _store, manager) = setup(transport, config).await;

        let err = manager.sync().await.unwrap_err();
        assert!(matches!(err, SyncError::Transport(TransportError::Timeout)));
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_fetch() {
        let transport = Arc::new(MemoryTransport::new());
        transport.set_delay(Duration::from_secs(5));
        let (_dir, store, manager) = setup(transport, SyncConfig::default()).await;
        let manager = Arc::new(manager);

        let running = {
            let manager = manager.clone();
            tokio::spawn(async move { manager.sync().await })
        };
        tokio::time::sleep(Duration::from_millis(50)).await;
        manager.cancel();

        let result = tokio::time::timeout(Duration::from_secs(2), running)
            .await
            .unwrap()
            .unwrap();
        assert!(matches!(result, Err(SyncError::Cancelled)));
        assert!(store.last_synced().await.is_none());

        // Later cycles refuse to start
        assert!(matches!(manager.sync().await, Err(SyncError::Cancelled)));
    }

    #[tokio::test]
    async fn test_disabled_manager() {
        let transport = Arc::new(MemoryTransport::new());
        let config = SyncConfig {
            enabled: false,
            ..Default::default()
        };
        let (_dir, _store, manager) = setup(transport.clone(), config).await;
        assert!(matches!(manager.sync().await, Err(SyncError::Disabled)));
        assert_eq!(transport.fetches.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_two_devices_converge() {
        let transport = Arc::new(MemoryTransport::new());
        let (_dir_a, store_a, device_a) = setup(transport.clone(), SyncConfig::default()).await;
        let (_dir_b, store_b, device_b) = setup(transport.clone(), SyncConfig::default()).await;

        store_a
            .upsert(EntryDraft::new(day("2026-02-01")).severity(2))
            .await
            .unwrap();
        device_a.sync().await.unwrap();

        store_b
            .upsert(EntryDraft::new(day("2026-02-03")).severity(4))
            .await
            .unwrap();
        device_b.sync().await.unwrap();
        assert!(store_b.get(day("2026-02-01")).await.is_some());

        // B deletes A's day; A picks up the tombstone
        store_b.delete(day("2026-02-01")).await.unwrap();
        device_b.sync().await.unwrap();
        device_a.sync().await.unwrap();

        assert!(store_a.get(day("2026-02-01")).await.is_none());
        assert!(store_a.get(day("2026-02-03")).await.is_some());
        assert_eq!(store_a.snapshot().await.entries, store_b.snapshot().await.entries);
    }

    #[tokio::test]
    async fn test_expired_tombstones_are_purged_everywhere() {
        let remote_doc = r#"{
            "2020-03-01": {"date":"2020-03-01","deleted":true,"created_at":"2020-03-01T08:00:00Z","updated_at":"2020-03-02T08:00:00Z"}
        }"#;
        let transport = Arc::new(MemoryTransport::with_document(remote_doc));
        let (_dir, store, manager) = setup(transport.clone(), SyncConfig::default()).await;

        // First cycle: local learns the tombstone
        manager.sync().await.unwrap();
        assert_eq!(store.snapshot().await.tombstone_count(), 1);

        // Second cycle: both sides hold it past retention
        let outcome = manager.sync().await.unwrap();
        assert_eq!(outcome.purged.len(), 1);
        assert!(store.snapshot().await.is_empty());
        let remote = Snapshot::from_document(&transport.document().unwrap()).unwrap();
        assert!(remote.is_empty());
    }
}
