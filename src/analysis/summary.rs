//! Journal summary statistics
//!
//! Descriptive numbers shown next to the correlation report: averages,
//! distributions, good/bad day counts and streaks.

use crate::journal::types::{DayEntry, Weather, MAX_SEVERITY};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

/// Days with severity at or below this are good days
pub const GOOD_DAY_MAX: u8 = 2;
/// Days with severity at or above this are bad days
pub const BAD_DAY_MIN: u8 = 4;
const TOP_FOODS_LIMIT: usize = 10;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StreakKind {
    Good,
    Bad,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoodCount {
    pub food: String,
    /// Days on which the food was recorded
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct JournalSummary {
    pub total_entries: usize,
    /// Entries that carry a severity reading
    pub rated_entries: usize,
    pub average_severity: Option<f64>,
    /// Count per severity 1..=5
    pub severity_distribution: BTreeMap<u8, u32>,
    pub good_days: u32,
    pub bad_days: u32,
    pub top_foods: Vec<FoodCount>,
    /// Length of the run of good or bad days ending at the latest rated entry
    pub current_streak: u32,
    pub current_streak_kind: Option<StreakKind>,
    pub best_good_streak: u32,
    pub average_stress: Option<f64>,
    pub average_sleep_quality: Option<f64>,
    pub fungal_active_days: u32,
    pub sweating_days: u32,
    pub weather_distribution: BTreeMap<Weather, u32>,
}

pub(crate) fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

pub(crate) fn average<I: Iterator<Item = u8>>(values: I) -> Option<f64> {
    let (sum, count) = values.fold((0u32, 0u32), |(s, c), v| (s + u32::from(v), c + 1));
    if count == 0 {
        None
    } else {
        Some(round2(f64::from(sum) / f64::from(count)))
    }
}

fn classify_day(severity: u8) -> Option<StreakKind> {
    if severity <= GOOD_DAY_MAX {
        Some(StreakKind::Good)
    } else if severity >= BAD_DAY_MIN {
        Some(StreakKind::Bad)
    } else {
        None
    }
}

/// Summarise live entries. Tombstones are ignored.
pub fn summarize(entries: &[DayEntry]) -> JournalSummary {
    let mut live: Vec<&DayEntry> = entries.iter().filter(|e| e.is_live()).collect();
    live.sort_by_key(|e| e.date);

    let severities: Vec<u8> = live.iter().filter_map(|e| e.severity).collect();

    let mut severity_distribution: BTreeMap<u8, u32> =
        (1..=MAX_SEVERITY).map(|s| (s, 0)).collect();
    for s in &severities {
        *severity_distribution.entry(*s).or_insert(0) += 1;
    }

    let mut food_days: HashMap<&str, u32> = HashMap::new();
    for entry in &live {
        for food in &entry.foods {
            *food_days.entry(food.as_str()).or_insert(0) += 1;
        }
    }
    let mut top_foods: Vec<FoodCount> = food_days
        .into_iter()
        .map(|(food, days)| FoodCount {
            food: food.to_string(),
            days,
        })
        .collect();
    top_foods.sort_by(|a, b| b.days.cmp(&a.days).then_with(|| a.food.cmp(&b.food)));
    top_foods.truncate(TOP_FOODS_LIMIT);

    let mut best_good_streak = 0;
    let mut run = 0;
    for s in &severities {
        if *s <= GOOD_DAY_MAX {
            run += 1;
            best_good_streak = best_good_streak.max(run);
        } else {
            run = 0;
        }
    }

    let current_streak_kind = severities.last().and_then(|s| classify_day(*s));
    let current_streak = match current_streak_kind {
        Some(kind) => severities
            .iter()
            .rev()
            .take_while(|s| classify_day(**s) == Some(kind))
            .count() as u32,
        None => 0,
    };

    let mut weather_distribution = BTreeMap::new();
    for w in live.iter().filter_map(|e| e.triggers.weather) {
        *weather_distribution.entry(w).or_insert(0) += 1;
    }

    JournalSummary {
        total_entries: live.len(),
        rated_entries: severities.len(),
        average_severity: average(severities.iter().copied()),
        severity_distribution,
        good_days: severities.iter().filter(|s| **s <= GOOD_DAY_MAX).count() as u32,
        bad_days: severities.iter().filter(|s| **s >= BAD_DAY_MIN).count() as u32,
        top_foods,
        current_streak,
        current_streak_kind,
        best_good_streak,
        average_stress: average(live.iter().filter_map(|e| e.triggers.stress_level)),
        average_sleep_quality: average(live.iter().filter_map(|e| e.triggers.sleep_quality)),
        fungal_active_days: live
            .iter()
            .filter(|e| e.triggers.fungal_active == Some(true))
            .count() as u32,
        sweating_days: live
            .iter()
            .filter(|e| e.triggers.sweating == Some(true))
            .count() as u32,
        weather_distribution,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::types::TriggerReadings;
    use chrono::Utc;

    fn entry(date: &str, severity: Option<u8>, foods: &[&str]) -> DayEntry {
        let now = Utc::now();
        DayEntry {
            date: date.parse().unwrap(),
            severity,
            foods: foods.iter().map(|f| f.to_string()).collect(),
            skin_notes: String::new(),
            food_notes: String::new(),
            notes: String::new(),
            triggers: TriggerReadings::default(),
            deleted: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_empty_summary() {
        let summary = summarize(&[]);
        assert_eq!(summary.total_entries, 0);
        assert_eq!(summary.average_severity, None);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.current_streak_kind, None);
        assert_eq!(summary.severity_distribution.len(), 5);
    }

    #[test]
    fn test_counts_and_averages() {
        let mut stressed = entry("2026-01-03", Some(5), &["Milch"]);
        stressed.triggers.stress_level = Some(4);
        stressed.triggers.weather = Some(Weather::Humid);
        stressed.triggers.fungal_active = Some(true);

        let entries = vec![
            entry("2026-01-01", Some(1), &["Milch", "Brot"]),
            entry("2026-01-02", Some(2), &["Milch"]),
            stressed,
            entry("2026-01-04", None, &["Ei"]),
        ];
        let summary = summarize(&entries);

        assert_eq!(summary.total_entries, 4);
        assert_eq!(summary.rated_entries, 3);
        assert_eq!(summary.average_severity, Some(2.67));
        assert_eq!(summary.good_days, 2);
        assert_eq!(summary.bad_days, 1);
        assert_eq!(summary.severity_distribution[&5], 1);
        assert_eq!(summary.top_foods[0].food, "Milch");
        assert_eq!(summary.top_foods[0].days, 3);
        assert_eq!(summary.average_stress, Some(4.0));
        assert_eq!(summary.fungal_active_days, 1);
        assert_eq!(summary.weather_distribution[&Weather::Humid], 1);
    }

    #[test]
    fn test_streaks() {
        let entries = vec![
            entry("2026-01-01", Some(1), &[]),
            entry("2026-01-02", Some(2), &[]),
            entry("2026-01-03", Some(1), &[]),
            entry("2026-01-04", Some(4), &[]),
            entry("2026-01-05", Some(2), &[]),
            entry("2026-01-06", Some(5), &[]),
            entry("2026-01-07", Some(4), &[]),
        ];
        let summary = summarize(&entries);
        assert_eq!(summary.best_good_streak, 3);
        assert_eq!(summary.current_streak, 2);
        assert_eq!(summary.current_streak_kind, Some(StreakKind::Bad));
    }

    #[test]
    fn test_neutral_day_ends_streak() {
        let entries = vec![
            entry("2026-01-01", Some(1), &[]),
            entry("2026-01-02", Some(3), &[]),
        ];
        let summary = summarize(&entries);
        assert_eq!(summary.current_streak, 0);
        assert_eq!(summary.current_streak_kind, None);
        assert_eq!(summary.best_good_streak, 1);
    }

    #[test]
    fn test_tombstones_ignored() {
        let mut gone = entry("2026-01-02", Some(5), &["Milch"]);
        gone.deleted = true;
        let summary = summarize(&[entry("2026-01-01", Some(1), &[]), gone]);
        assert_eq!(summary.total_entries, 1);
        assert!(summary.top_foods.is_empty());
    }
}
