//! Sync snapshot
//!
//! The reconciler's working unit: every record (tombstones included) keyed
//! by date, plus the device's last-synced marker. On the wire a snapshot is
//! the same date-keyed JSON document the entry store writes to disk; the
//! marker stays local.

use crate::journal::store::{decode_entry, encode_entries};
use crate::journal::types::DayEntry;
use crate::sync::error::{SyncError, SyncResult};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    pub entries: BTreeMap<NaiveDate, DayEntry>,
    pub last_synced: Option<DateTime<Utc>>,
}

/// A tombstone removed after both sides observed it past retention
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct PurgedTombstone {
    pub date: NaiveDate,
    pub updated_at: DateTime<Utc>,
}

impl Snapshot {
    pub fn from_entries<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = DayEntry>,
    {
        Self {
            entries: entries.into_iter().map(|e| (e.date, e)).collect(),
            last_synced: None,
        }
    }

    pub fn get(&self, date: NaiveDate) -> Option<&DayEntry> {
        self.entries.get(&date)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn tombstone_count(&self) -> usize {
        self.entries.values().filter(|e| e.is_tombstone()).count()
    }

    /// Remove purged tombstones still carrying the purged timestamp
    pub fn remove_purged(&mut self, purged: &[PurgedTombstone]) {
        for p in purged {
            let matches = self
                .entries
                .get(&p.date)
                .map(|e| e.is_tombstone() && e.updated_at == p.updated_at)
                .unwrap_or(false);
            if matches {
                self.entries.remove(&p.date);
            }
        }
    }

    /// Encode as the date-keyed wire document
    pub fn to_document(&self) -> SyncResult<String> {
        let map = encode_entries(self.entries.values())?;
        serde_json::to_string_pretty(&Value::Object(map)).map_err(|e| SyncError::Data(e.to_string()))
    }

    /// Decode a remote document.
    ///
    /// Unlike the local store, a remote snapshot is all-or-nothing: any
    /// undecodable or invalid record rejects the whole document so a corrupt
    /// remote can never be merged into the journal. An empty body is an empty
    /// snapshot.
    pub fn from_document(document: &str) -> SyncResult<Self> {
        if document.trim().is_empty() {
            return Ok(Self::default());
        }

        let value: Value = serde_json::from_str(document)
            .map_err(|e| SyncError::Data(format!("remote document is not JSON: {}", e)))?;
        let Value::Object(map) = value else {
            return Err(SyncError::Data(
                "remote document is not an object keyed by date".to_string(),
            ));
        };

        let mut entries = BTreeMap::new();
        for (key, value) in map {
            let entry =
                decode_entry(&key, value).map_err(|reason| SyncError::Data(format!("{}: {}", key, reason)))?;
            entries.insert(entry.date, entry);
        }

        Ok(Self {
            entries,
            last_synced: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::types::TriggerReadings;
    use chrono::TimeZone;

    fn entry(date: &str, severity: u8) -> DayEntry {
        let at = Utc.with_ymd_and_hms(2026, 2, 1, 10, 30, 0).unwrap();
        DayEntry {
            date: date.parse().unwrap(),
            severity: Some(severity),
            foods: ["Milch".to_string()].into_iter().collect(),
            skin_notes: String::new(),
            food_notes: String::new(),
            notes: "juckt".to_string(),
            triggers: TriggerReadings::default(),
            deleted: false,
            created_at: at,
            updated_at: at,
        }
    }

    #[test]
    fn test_document_roundtrip_keeps_tombstones() {
        let at = Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap();
        let snapshot = Snapshot::from_entries(vec![
            entry("2026-02-01", 2),
            DayEntry::tombstone("2026-02-02".parse().unwrap(), at, at),
        ]);

        let doc = snapshot.to_document().unwrap();
        let value: Value = serde_json::from_str(&doc).unwrap();
        assert_eq!(value["2026-02-01"]["severity"], 2);
        assert_eq!(value["2026-02-02"]["deleted"], true);

        let decoded = Snapshot::from_document(&doc).unwrap();
        assert_eq!(decoded, snapshot);
        assert_eq!(decoded.tombstone_count(), 1);
    }

    #[test]
    fn test_empty_document() {
        assert!(Snapshot::from_document("").unwrap().is_empty());
        assert!(Snapshot::from_document("{}").unwrap().is_empty());
    }

    #[test]
    fn test_corrupt_document_is_rejected() {
        assert!(matches!(
            Snapshot::from_document("{not json"),
            Err(SyncError::Data(_))
        ));
        assert!(matches!(
            Snapshot::from_document("[]"),
            Err(SyncError::Data(_))
        ));

        // One bad record rejects the whole remote
        let doc = r#"{
            "2026-02-01": {"date":"2026-02-01","severity":2,"created_at":"2026-02-01T08:00:00Z","updated_at":"2026-02-01T08:00:00Z"},
            "2026-02-02": {"date":"2026-02-02","severity":8,"created_at":"2026-02-02T08:00:00Z","updated_at":"2026-02-02T08:00:00Z"}
        }"#;
        let err = Snapshot::from_document(doc).unwrap_err();
        assert!(err.to_string().contains("2026-02-02"));
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_key_must_match_date() {
        let doc = r#"{"2026-02-09": {"date":"2026-02-01","created_at":"2026-02-01T08:00:00Z","updated_at":"2026-02-01T08:00:00Z"}}"#;
        assert!(Snapshot::from_document(doc).is_err());
    }

    #[test]
    fn test_remove_purged_checks_timestamp() {
        let at = Utc.with_ymd_and_hms(2026, 2, 3, 9, 0, 0).unwrap();
        let date: NaiveDate = "2026-02-02".parse().unwrap();
        let mut snapshot = Snapshot::from_entries(vec![DayEntry::tombstone(date, at, at)]);

        snapshot.remove_purged(&[PurgedTombstone {
            date,
            updated_at: at + chrono::Duration::seconds(1),
        }]);
        assert_eq!(snapshot.len(), 1);

        snapshot.remove_purged(&[PurgedTombstone { date, updated_at: at }]);
        assert!(snapshot.is_empty());
    }
}
