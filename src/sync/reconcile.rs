//! Sync Reconciler
//!
//! Whole-record last-writer-wins merge of a local and a remote snapshot:
//!
//! ```text
//! only local / only remote        -> keep it
//! updated_at differs              -> strictly later record wins
//! updated_at equal, same content  -> identical, nothing to do
//! updated_at equal, content differs -> remote wins, conflict recorded
//! ```
//!
//! Tombstones take part in the comparison like any other record, so a
//! later edit revives a deleted day and a later delete removes an edit.

use crate::sync::snapshot::{PurgedTombstone, Snapshot};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// How a tie was settled
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Resolution {
    RemotePreferred,
}

/// A record with equal timestamps but different content on both sides
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Conflict {
    pub date: NaiveDate,
    pub updated_at: DateTime<Utc>,
    pub resolution: Resolution,
    /// Whether the discarded local copy was a tombstone
    pub local_deleted: bool,
    pub remote_deleted: bool,
}

/// Per-date merge counts
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct MergeStats {
    pub local_only: usize,
    pub remote_only: usize,
    pub local_won: usize,
    pub remote_won: usize,
    pub identical: usize,
    pub conflicts: usize,
}

/// Result of merging two snapshots
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reconciliation {
    pub merged: Snapshot,
    pub conflicts: Vec<Conflict>,
    pub stats: MergeStats,
}

impl MergeStats {
    /// Number of dates in the merged snapshot before purging
    pub fn total(&self) -> usize {
        self.local_only
            + self.remote_only
            + self.local_won
            + self.remote_won
            + self.identical
            + self.conflicts
    }
}

impl Reconciliation {
    /// Whether the merge changes anything the local side holds
    pub fn changes_local(&self) -> bool {
        self.stats.remote_only + self.stats.remote_won + self.stats.conflicts > 0
    }

    /// Whether the merge changes anything the remote side holds
    pub fn changes_remote(&self) -> bool {
        self.stats.local_only + self.stats.local_won > 0
    }
}

/// Merge `local` and `remote`.
///
/// The merged `last_synced` is the later of the two markers.
pub fn reconcile(local: &Snapshot, remote: &Snapshot) -> Reconciliation {
    let mut merged = Snapshot {
        entries: Default::default(),
        last_synced: local.last_synced.max(remote.last_synced),
    };
    let mut conflicts = Vec::new();
    let mut stats = MergeStats::default();

    let dates: BTreeSet<NaiveDate> = local
        .entries
        .keys()
        .chain(remote.entries.keys())
        .copied()
        .collect();

    for date in dates {
        let winner = match (local.entries.get(&date), remote.entries.get(&date)) {
            (Some(l), None) => {
                stats.local_only += 1;
                l
            }
            (None, Some(r)) => {
                stats.remote_only += 1;
                r
            }
            (Some(l), Some(r)) => match l.updated_at.cmp(&r.updated_at) {
                Ordering::Greater => {
                    stats.local_won += 1;
                    l
                }
                Ordering::Less => {
                    stats.remote_won += 1;
                    r
                }
                Ordering::Equal if l == r => {
                    stats.identical += 1;
                    r
                }
                Ordering::Equal => {
                    stats.conflicts += 1;
                    conflicts.push(Conflict {
                        date,
                        updated_at: r.updated_at,
                        resolution: Resolution::RemotePreferred,
                        local_deleted: l.is_tombstone(),
                        remote_deleted: r.is_tombstone(),
                    });
                    r
                }
            },
            (None, None) => continue,
        };
        merged.entries.insert(date, winner.clone());
    }

    Reconciliation {
        merged,
        conflicts,
        stats,
    }
}

/// Tombstones both sides hold with the same timestamp, deleted at least
/// `retention` before `now`
pub fn expired_tombstones(
    local: &Snapshot,
    remote: &Snapshot,
    now: DateTime<Utc>,
    retention: Duration,
) -> Vec<PurgedTombstone> {
    let Some(horizon) = now.checked_sub_signed(retention) else {
        return Vec::new();
    };

    local
        .entries
        .values()
        .filter(|l| l.is_tombstone() && l.updated_at <= horizon)
        .filter(|l| {
            remote
                .entries
                .get(&l.date)
                .map(|r| r.is_tombstone() && r.updated_at == l.updated_at)
                .unwrap_or(false)
        })
        .map(|l| PurgedTombstone {
            date: l.date,
            updated_at: l.updated_at,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::types::{DayEntry, TriggerReadings};
    use chrono::TimeZone;

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 10, hour, 0, 0).unwrap()
    }

    fn entry(date: &str, severity: u8, updated: DateTime<Utc>) -> DayEntry {
        DayEntry {
            date: date.parse().unwrap(),
            severity: Some(severity),
            foods: Default::default(),
            skin_notes: String::new(),
            food_notes: String::new(),
            notes: String::new(),
            triggers: TriggerReadings::default(),
            deleted: false,
            created_at: at(0),
            updated_at: updated,
        }
    }

    fn tombstone(date: &str, updated: DateTime<Utc>) -> DayEntry {
        DayEntry::tombstone(date.parse().unwrap(), at(0), updated)
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_self_merge_is_idempotent() {
        let mut a = Snapshot::from_entries(vec![
            entry("2026-02-01", 2, at(1)),
            entry("2026-02-02", 4, at(2)),
            tombstone("2026-02-03", at(3)),
        ]);
        a.last_synced = Some(at(4));

        let result = reconcile(&a, &a);
        assert_eq!(result.merged, a);
        assert!(result.conflicts.is_empty());
        assert_eq!(result.stats.identical, 3);
        assert!(!result.changes_local());
        assert!(!result.changes_remote());
    }

    #[test]
    fn test_one_sided_dates_are_kept() {
        let local = Snapshot::from_entries(vec![entry("2026-02-01", 2, at(1))]);
        let remote = Snapshot::from_entries(vec![entry("2026-02-02", 3, at(1))]);

        let result = reconcile(&local, &remote);
        assert_eq!(result.merged.len(), 2);
        assert_eq!(result.stats.local_only, 1);
        assert_eq!(result.stats.remote_only, 1);
        assert!(result.changes_local());
        assert!(result.changes_remote());
    }

    #[test]
    fn test_later_remote_wins_without_conflict() {
        let local = Snapshot::from_entries(vec![entry("2026-02-01", 2, at(1))]);
        let remote = Snapshot::from_entries(vec![entry("2026-02-01", 5, at(2))]);

        let result = reconcile(&local, &remote);
        assert_eq!(result.merged.get(day("2026-02-01")), remote.get(day("2026-02-01")));
        assert!(result.conflicts.is_empty());
        assert_eq!(result.stats.remote_won, 1);
    }

    #[test]
    fn test_later_local_wins() {
        let local = Snapshot::from_entries(vec![entry("2026-02-01", 2, at(3))]);
        let remote = Snapshot::from_entries(vec![entry("2026-02-01", 5, at(2))]);

        let result = reconcile(&local, &remote);
        assert_eq!(result.merged.get(day("2026-02-01")).unwrap().severity, Some(2));
        assert_eq!(result.stats.local_won, 1);
    }

    #[test]
    fn test_equal_timestamps_prefer_remote_and_record_conflict() {
        let mut l = entry("2026-02-05", 3, at(5));
        l.notes = "local".into();
        let mut r = entry("2026-02-05", 3, at(5));
        r.notes = "remote".into();

        let result = reconcile(
            &Snapshot::from_entries(vec![l]),
            &Snapshot::from_entries(vec![r.clone()]),
        );
        assert_eq!(result.merged.get(day("2026-02-05")), Some(&r));
        assert_eq!(result.conflicts.len(), 1);
        assert_eq!(result.conflicts[0].date, day("2026-02-05"));
        assert_eq!(result.conflicts[0].resolution, Resolution::RemotePreferred);
    }

    #[test]
    fn test_tombstones_follow_last_writer_wins() {
        // Later delete beats an earlier edit
        let result = reconcile(
            &Snapshot::from_entries(vec![entry("2026-02-01", 2, at(1))]),
            &Snapshot::from_entries(vec![tombstone("2026-02-01", at(2))]),
        );
        assert!(result.merged.get(day("2026-02-01")).unwrap().is_tombstone());

        // Later edit revives a deleted day
        let result = reconcile(
            &Snapshot::from_entries(vec![entry("2026-02-01", 2, at(3))]),
            &Snapshot::from_entries(vec![tombstone("2026-02-01", at(2))]),
        );
        assert!(result.merged.get(day("2026-02-01")).unwrap().is_live());
    }

    #[test]
    fn test_merge_content_is_direction_independent() {
        let a = Snapshot::from_entries(vec![
            entry("2026-02-01", 1, at(1)),
            entry("2026-02-02", 2, at(5)),
            tombstone("2026-02-03", at(6)),
            entry("2026-02-04", 4, at(2)),
        ]);
        let b = Snapshot::from_entries(vec![
            entry("2026-02-02", 5, at(4)),
            entry("2026-02-03", 3, at(2)),
            entry("2026-02-04", 1, at(3)),
            entry("2026-02-06", 2, at(1)),
        ]);

        let ab = reconcile(&a, &b);
        let ba = reconcile(&b, &a);
        assert_eq!(ab.merged.entries, ba.merged.entries);
        assert_eq!(ab.merged.len(), 5);
        assert_eq!(ab.stats.local_won, ba.stats.remote_won);
    }

    #[test]
    fn test_last_synced_takes_later_marker() {
        let mut local = Snapshot::default();
        local.last_synced = Some(at(1));
        let mut remote = Snapshot::default();
        remote.last_synced = Some(at(2));
        assert_eq!(reconcile(&local, &remote).merged.last_synced, Some(at(2)));
        assert_eq!(reconcile(&local, &Snapshot::default()).merged.last_synced, Some(at(1)));
    }

    #[test]
    fn test_expired_tombstones_require_both_sides() {
        let now = at(0) + Duration::days(100);
        let retention = Duration::days(90);

        let local = Snapshot::from_entries(vec![
            tombstone("2026-02-01", at(1)),
            tombstone("2026-02-02", at(1)),
            tombstone("2026-02-03", now - Duration::days(1)),
            tombstone("2026-02-04", at(1)),
        ]);
        let remote = Snapshot::from_entries(vec![
            tombstone("2026-02-01", at(1)),
            // Remote has not seen the deletion yet
            entry("2026-02-02", 2, at(0)),
            tombstone("2026-02-03", now - Duration::days(1)),
            // Different deletion time
            tombstone("2026-02-04", at(2)),
        ]);

        let purged = expired_tombstones(&local, &remote, now, retention);
        assert_eq!(purged.len(), 1);
        assert_eq!(purged[0].date, day("2026-02-01"));
    }
}
