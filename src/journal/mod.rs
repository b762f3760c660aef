//! Skin journal
//!
//! - **types**: Day entries, trigger readings, drafts
//! - **validation**: Sanitisers and structural checks
//! - **store**: Durable entry store with atomic writes and tombstones
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use flaretrack::journal::{EntryDraft, EntryStore, StoreConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = EntryStore::open(StoreConfig::new("./journal")).await?;
//!
//!     let date = "2026-01-10".parse()?;
//!     store.upsert(EntryDraft::new(date).severity(3).food("Milch")).await?;
//!
//!     for entry in store.entries().await {
//!         println!("{}", entry);
//!     }
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod store;
pub mod types;
pub mod validation;

pub use error::{EntryIssue, JournalError, JournalResult};
pub use store::{ApplyStats, EntryStore, StoreConfig};
pub use types::{DayEntry, EntryDraft, TriggerReadings, Weather, MAX_SEVERITY, MIN_SEVERITY};
pub use validation::{sanitize_item, sanitize_items, sanitize_notes, validate_entry};
