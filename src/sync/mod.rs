//! Multi-device sync
//!
//! - **snapshot**: Snapshot type and its wire document
//! - **reconcile**: Last-writer-wins merge, conflicts, tombstone purge
//! - **transport**: Remote document transports (file, HTTP)
//! - **manager**: One sync cycle as a state machine with timeouts and cancellation
//! - **scheduler**: Coalescing request queue fed by saves and a periodic timer
//! - **error**: Error types
//!
//! # Architecture
//!
//! ```text
//! EntryStore::snapshot ─┐
//!                       ├─> reconcile ─> push merged ─> apply locally ─> mark synced
//! transport.fetch ──────┘
//! ```

pub mod error;
pub mod manager;
pub mod reconcile;
pub mod scheduler;
pub mod snapshot;
pub mod transport;

pub use error::{SyncError, SyncResult, TransportError};
pub use manager::{SyncConfig, SyncManager, SyncOutcome, SyncPhase, SyncState, SyncStatus};
pub use reconcile::{expired_tombstones, reconcile, Conflict, MergeStats, Reconciliation, Resolution};
pub use scheduler::{RequestOutcome, SyncScheduler, SyncTrigger};
pub use snapshot::{PurgedTombstone, Snapshot};
pub use transport::{FileTransport, HttpTransport, HttpTransportConfig, SyncTransport};
