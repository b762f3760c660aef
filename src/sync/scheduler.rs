//! Sync Scheduler
//!
//! Save-triggered, periodic and manual sync requests all land on one
//! single-consumer queue with room for a single pending request:
//!
//! ```text
//! save ─┐
//! timer ├─> [ pending (0..1) ] ─> worker ─> SyncManager::sync
//! manual┘
//! ```
//!
//! A request made while one is already pending is coalesced into it; a
//! request made while a cycle runs is queued and runs once the cycle ends.

use crate::sync::manager::SyncManager;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Why a sync was requested
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SyncTrigger {
    LocalSave,
    Periodic,
    Manual,
    Startup,
}

/// What happened to a request
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestOutcome {
    /// A new cycle will run
    Queued,
    /// Merged into a cycle that was already pending
    Coalesced,
    /// The scheduler has shut down
    Stopped,
}

/// Single-consumer sync queue with a periodic ticker
pub struct SyncScheduler {
    queue: mpsc::Sender<SyncTrigger>,
    shutdown: watch::Sender<bool>,
    manager: Arc<SyncManager>,
    tasks: std::sync::Mutex<Vec<JoinHandle<()>>>,
}

impl SyncScheduler {
    /// Spawn the worker and the ticker. Must be called inside a tokio runtime.
    pub fn start(manager: Arc<SyncManager>) -> Self {
        let (queue, receiver) = mpsc::channel(1);
        let (shutdown, shutdown_rx) = watch::channel(false);
        let interval = manager.config().interval;

        tracing::info!(
            interval_secs = interval.as_secs(),
            transport = manager.transport_name(),
            "Starting sync scheduler"
        );

        let worker = tokio::spawn(run_worker(manager.clone(), receiver, shutdown_rx.clone()));
        let ticker = tokio::spawn(run_ticker(queue.clone(), interval, shutdown_rx));

        Self {
            queue,
            shutdown,
            manager,
            tasks: std::sync::Mutex::new(vec![worker, ticker]),
        }
    }

    /// Request a sync cycle without waiting for it
    pub fn request(&self, trigger: SyncTrigger) -> RequestOutcome {
        let outcome = match self.queue.try_send(trigger) {
            Ok(()) => RequestOutcome::Queued,
            Err(TrySendError::Full(_)) => RequestOutcome::Coalesced,
            Err(TrySendError::Closed(_)) => RequestOutcome::Stopped,
        };
        tracing::debug!(trigger = ?trigger, outcome = ?outcome, "Sync requested");
        outcome
    }

    pub fn manager(&self) -> &Arc<SyncManager> {
        &self.manager
    }

    /// Stop accepting requests, cancel the in-flight cycle and wait for the
    /// worker and ticker to exit
    pub async fn shutdown(&self) {
        self.shutdown.send_replace(true);
        self.manager.cancel();

        let tasks: Vec<JoinHandle<()>> = match self.tasks.lock() {
            Ok(mut tasks) => tasks.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        };
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Sync task ended abnormally");
            }
        }
        tracing::info!("Sync scheduler stopped");
    }
}

async fn run_worker(
    manager: Arc<SyncManager>,
    mut receiver: mpsc::Receiver<SyncTrigger>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => break,
            trigger = receiver.recv() => match trigger {
                Some(trigger) => {
                    tracing::debug!(trigger = ?trigger, "Running sync");
                    // Outcome is recorded and logged by the manager
                    let _ = manager.sync().await;
                }
                None => break,
            },
        }
    }
    receiver.close();
}

async fn run_ticker(
    queue: mpsc::Sender<SyncTrigger>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(period);

    // Skip the first immediate tick
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = shutdown.wait_for(|stop| *stop) => break,
            _ = ticker.tick() => {
                if let Err(TrySendError::Closed(_)) = queue.try_send(SyncTrigger::Periodic) {
                    break;
                }
            }
        }
    }
}
