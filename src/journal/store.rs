//! Entry store
//!
//! Durable, validated storage of `DayEntry` records keyed by date:
//! - `entries.json`: a JSON object mapping `YYYY-MM-DD` to entry objects
//! - `sync_state.json`: the store-level last-synced marker
//!
//! Every write rewrites the file atomically (temp file + rename) while the
//! state write lock is held, so readers never observe a partial update.
//! Records that fail to load are reported and written back verbatim.

use crate::journal::error::{EntryIssue, JournalError, JournalResult};
use crate::journal::types::{DayEntry, EntryDraft};
use crate::journal::validation::{sanitize_items, sanitize_notes, validate_entry};
use crate::sync::snapshot::{PurgedTombstone, Snapshot};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Configuration for the entry store
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Directory holding the journal files
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("flaretrack_data"),
        }
    }
}

impl StoreConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// Get path to the entries file
    pub fn entries_path(&self) -> PathBuf {
        self.data_dir.join("entries.json")
    }

    /// Get path to the sync marker file
    pub fn sync_state_path(&self) -> PathBuf {
        self.data_dir.join("sync_state.json")
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.data_dir.join("backups")
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SyncMarker {
    last_synced: Option<DateTime<Utc>>,
}

/// Decode one keyed record, checking the key matches the entry date and the
/// entry passes validation
pub(crate) fn decode_entry(key: &str, value: Value) -> Result<DayEntry, String> {
    let date = NaiveDate::parse_from_str(key, "%Y-%m-%d")
        .map_err(|_| format!("key '{}' is not a YYYY-MM-DD date", key))?;
    let entry: DayEntry =
        serde_json::from_value(value).map_err(|e| format!("malformed entry: {}", e))?;
    if entry.date != date {
        return Err(format!("entry date {} does not match key {}", entry.date, key));
    }
    validate_entry(&entry).map_err(|reasons| reasons.join("; "))?;
    Ok(entry)
}

/// Encode entries as a date-keyed JSON object
pub(crate) fn encode_entries<'a, I>(entries: I) -> JournalResult<Map<String, Value>>
where
    I: IntoIterator<Item = &'a DayEntry>,
{
    let mut map = Map::new();
    for entry in entries {
        map.insert(entry.date.to_string(), serde_json::to_value(entry)?);
    }
    Ok(map)
}

/// Next `updated_at` for a record: now, bumped past the previous value if
/// the clock has not moved forward
fn next_timestamp(previous: Option<DateTime<Utc>>, now: DateTime<Utc>) -> DateTime<Utc> {
    match previous {
        Some(prev) if now <= prev => prev + Duration::milliseconds(1),
        _ => now,
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)
}

/// Internal state for the entry store
#[derive(Debug, Default)]
struct StoreState {
    /// All records including tombstones
    entries: BTreeMap<NaiveDate, DayEntry>,
    /// Stored records that failed to load, kept for write-back
    rejected: BTreeMap<String, Value>,
    /// Why each rejected record was skipped
    issues: Vec<EntryIssue>,
    last_synced: Option<DateTime<Utc>>,
}

/// Summary of a merged snapshot applied to the store
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplyStats {
    /// Records inserted or replaced
    pub updated: usize,
    /// Tombstones removed after purge
    pub purged: usize,
    /// Records kept because the local copy was written after the snapshot
    pub kept_newer: usize,
}

/// The journal's entry store
pub struct EntryStore {
    config: StoreConfig,
    state: RwLock<StoreState>,
}

impl EntryStore {
    /// Open the store, loading any existing journal
    pub async fn open(config: StoreConfig) -> JournalResult<Self> {
        std::fs::create_dir_all(&config.data_dir)?;

        let (entries, rejected, issues) = Self::load_entries(&config.entries_path())?;
        let last_synced = Self::load_marker(&config.sync_state_path())?;

        for issue in &issues {
            tracing::warn!("Skipping stored entry {}", issue);
        }
        tracing::info!(
            "Loaded {} entries from {:?} ({} rejected)",
            entries.len(),
            config.entries_path(),
            issues.len()
        );

        Ok(Self {
            config,
            state: RwLock::new(StoreState {
                entries,
                rejected,
                issues,
                last_synced,
            }),
        })
    }

    #[allow(clippy::type_complexity)]
    fn load_entries(
        path: &Path,
    ) -> JournalResult<(
        BTreeMap<NaiveDate, DayEntry>,
        BTreeMap<String, Value>,
        Vec<EntryIssue>,
    )> {
        let mut entries = BTreeMap::new();
        let mut rejected = BTreeMap::new();
        let mut issues = Vec::new();

        if !path.exists() {
            return Ok((entries, rejected, issues));
        }

        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok((entries, rejected, issues));
        }
        let document: Value = serde_json::from_str(&content)
            .map_err(|e| JournalError::Corrupt(format!("{:?}: {}", path, e)))?;
        let Value::Object(map) = document else {
            return Err(JournalError::Corrupt(format!(
                "{:?}: expected an object keyed by date",
                path
            )));
        };

        for (key, value) in map {
            match decode_entry(&key, value.clone()) {
                Ok(entry) => {
                    entries.insert(entry.date, entry);
                }
                Err(reason) => {
                    issues.push(EntryIssue::new(key.clone(), reason));
                    rejected.insert(key, value);
                }
            }
        }

        Ok((entries, rejected, issues))
    }

    fn load_marker(path: &Path) -> JournalResult<Option<DateTime<Utc>>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(path)?;
        let marker: SyncMarker = serde_json::from_str(&content)?;
        Ok(marker.last_synced)
    }

    /// Write the full state to disk. Caller holds the write lock.
    /// The entries file content: every record plus the rejected raw ones
    fn document(state: &StoreState) -> JournalResult<String> {
        let mut map = Map::new();
        for (key, value) in &state.rejected {
            map.insert(key.clone(), value.clone());
        }
        map.extend(encode_entries(state.entries.values())?);
        Ok(serde_json::to_string_pretty(&Value::Object(map))?)
    }

    fn persist(&self, state: &StoreState) -> JournalResult<()> {
        let content = Self::document(state)?;
        write_atomic(&self.config.entries_path(), content.as_bytes())?;
        Ok(())
    }

    /// Write `entry` into the state and persist, restoring the previous
    /// record if the disk write fails
    fn commit(&self, state: &mut StoreState, entry: DayEntry) -> JournalResult<()> {
        let date = entry.date;
        let key = date.to_string();
        let previous = state.entries.insert(date, entry);
        let previous_rejected = state.rejected.remove(&key);

        if let Err(e) = self.persist(state) {
            match previous {
                Some(p) => state.entries.insert(date, p),
                None => state.entries.remove(&date),
            };
            if let Some(raw) = previous_rejected {
                state.rejected.insert(key, raw);
            }
            return Err(e);
        }

        if previous_rejected.is_some() {
            state.issues.retain(|issue| issue.key != key);
        }
        Ok(())
    }

    /// Create or replace the entry for the draft's date.
    ///
    /// Text is sanitised, then the resulting entry is validated. An existing
    /// live entry keeps its `created_at`; `updated_at` always moves strictly
    /// past the previous value for the date.
    pub async fn upsert(&self, draft: EntryDraft) -> JournalResult<DayEntry> {
        let mut state = self.state.write().await;
        let now = Utc::now();
        let previous = state.entries.get(&draft.date);

        let created_at = previous
            .filter(|e| e.is_live())
            .map(|e| e.created_at)
            .unwrap_or(now);
        let updated_at = next_timestamp(previous.map(|e| e.updated_at), now).max(created_at);

        let mut triggers = draft.triggers;
        triggers.contact_exposures = sanitize_items(&triggers.contact_exposures);

        let entry = DayEntry {
            date: draft.date,
            severity: draft.severity,
            foods: sanitize_items(&draft.foods),
            skin_notes: sanitize_notes(&draft.skin_notes),
            food_notes: sanitize_notes(&draft.food_notes),
            notes: sanitize_notes(&draft.notes),
            triggers,
            deleted: false,
            created_at,
            updated_at,
        };

        validate_entry(&entry).map_err(|reasons| JournalError::InvalidEntry {
            date: entry.date.to_string(),
            reasons,
        })?;

        self.commit(&mut state, entry.clone())?;
        tracing::debug!("Saved entry {}", entry);
        Ok(entry)
    }

    /// Delete the entry for a date by writing a tombstone.
    ///
    /// Returns `false` if there was no live entry to delete.
    pub async fn delete(&self, date: NaiveDate) -> JournalResult<bool> {
        let mut state = self.state.write().await;
        let Some(existing) = state.entries.get(&date).filter(|e| e.is_live()) else {
            return Ok(false);
        };

        let deleted_at = next_timestamp(Some(existing.updated_at), Utc::now());
        let tombstone = DayEntry::tombstone(date, existing.created_at, deleted_at);
        self.commit(&mut state, tombstone)?;

        tracing::debug!("Deleted entry {}", date);
        Ok(true)
    }

    /// Get the live entry for a date
    pub async fn get(&self, date: NaiveDate) -> Option<DayEntry> {
        let state = self.state.read().await;
        state.entries.get(&date).filter(|e| e.is_live()).cloned()
    }

    /// All live entries in date order
    pub async fn entries(&self) -> Vec<DayEntry> {
        let state = self.state.read().await;
        state.entries.values().filter(|e| e.is_live()).cloned().collect()
    }

    /// Live entries with `start <= date <= end`
    pub async fn range(&self, start: NaiveDate, end: NaiveDate) -> Vec<DayEntry> {
        if start > end {
            return Vec::new();
        }
        let state = self.state.read().await;
        state
            .entries
            .range(start..=end)
            .map(|(_, e)| e)
            .filter(|e| e.is_live())
            .cloned()
            .collect()
    }

    /// Live entries from the last `days` days ending at `today` (inclusive)
    pub async fn recent(&self, days: u32, today: NaiveDate) -> Vec<DayEntry> {
        let start = today
            .checked_sub_signed(Duration::days(i64::from(days.saturating_sub(1))))
            .unwrap_or(NaiveDate::MIN);
        self.range(start, today).await
    }

    /// Every food name recorded on a live entry, sorted
    pub async fn all_foods(&self) -> Vec<String> {
        let state = self.state.read().await;
        let foods: BTreeSet<&String> = state
            .entries
            .values()
            .filter(|e| e.is_live())
            .flat_map(|e| e.foods.iter())
            .collect();
        foods.into_iter().cloned().collect()
    }

    /// Every contact exposure recorded on a live entry, sorted
    pub async fn all_contacts(&self) -> Vec<String> {
        let state = self.state.read().await;
        let contacts: BTreeSet<&String> = state
            .entries
            .values()
            .filter(|e| e.is_live())
            .flat_map(|e| e.triggers.contact_exposures.iter())
            .collect();
        contacts.into_iter().cloned().collect()
    }

    /// Number of live entries
    pub async fn len(&self) -> usize {
        let state = self.state.read().await;
        state.entries.values().filter(|e| e.is_live()).count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Records skipped at load time
    pub async fn load_issues(&self) -> Vec<EntryIssue> {
        self.state.read().await.issues.clone()
    }

    pub async fn last_synced(&self) -> Option<DateTime<Utc>> {
        self.state.read().await.last_synced
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Copy every record (tombstones included) and the last-synced marker
    /// under a single read lock
    pub async fn snapshot(&self) -> Snapshot {
        let state = self.state.read().await;
        Snapshot {
            entries: state.entries.clone(),
            last_synced: state.last_synced,
        }
    }

    /// Apply a merged snapshot and drop purged tombstones in one write.
    ///
    /// A local record written after the snapshot was taken (strictly newer
    /// `updated_at`) is kept; it will be carried by the next sync cycle. On a
    /// failed disk write the in-memory state is rolled back.
    pub async fn apply_merged(
        &self,
        merged: &Snapshot,
        purged: &[PurgedTombstone],
    ) -> JournalResult<ApplyStats> {
        let mut state = self.state.write().await;
        let backup = (
            state.entries.clone(),
            state.rejected.clone(),
            state.issues.clone(),
        );
        let mut stats = ApplyStats::default();

        for (date, incoming) in &merged.entries {
            match state.entries.get(date) {
                Some(current) if current == incoming => {}
                Some(current) if current.updated_at > incoming.updated_at => {
                    stats.kept_newer += 1;
                }
                _ => {
                    state.entries.insert(*date, incoming.clone());
                    // A valid record replaces whatever failed to load for the date
                    let key = date.to_string();
                    if state.rejected.remove(&key).is_some() {
                        state.issues.retain(|issue| issue.key != key);
                    }
                    stats.updated += 1;
                }
            }
        }

        for purge in purged {
            let expired = state
                .entries
                .get(&purge.date)
                .map(|e| e.is_tombstone() && e.updated_at == purge.updated_at)
                .unwrap_or(false);
            if expired {
                state.entries.remove(&purge.date);
                stats.purged += 1;
            }
        }

        if stats.updated == 0 && stats.purged == 0 {
            return Ok(stats);
        }

        if let Err(e) = self.persist(&state) {
            let (entries, rejected, issues) = backup;
            state.entries = entries;
            state.rejected = rejected;
            state.issues = issues;
            return Err(e);
        }

        Ok(stats)
    }

    /// Write a timestamped copy of the entries file to `backups/` under the
    /// data directory and return its path.
    ///
    /// The copy has the same layout as `entries.json`, tombstones and
    /// unreadable records included, so it can be restored with a JSON import.
    pub async fn create_backup(&self) -> JournalResult<PathBuf> {
        let state = self.state.read().await;
        let content = Self::document(&state)?;
        let name = format!("entries_{}.json", Utc::now().format("%Y%m%d_%H%M%S_%3f"));
        let path = self.config.backup_dir().join(name);
        write_atomic(&path, content.as_bytes())?;

        tracing::info!(path = %path.display(), "Created journal backup");
        Ok(path)
    }

    /// Record a completed sync
    pub async fn mark_synced(&self, at: DateTime<Utc>) -> JournalResult<()> {
        let mut state = self.state.write().await;
        let marker = SyncMarker {
            last_synced: Some(at),
        };
        let content = serde_json::to_string_pretty(&marker)?;
        write_atomic(&self.config.sync_state_path(), content.as_bytes())?;
        state.last_synced = Some(at);
        Ok(())
    }
}
