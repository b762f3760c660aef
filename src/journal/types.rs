//! Core data types for the skin journal
//!
//! This module defines the records the rest of the crate operates on:
//! - `DayEntry`: one record per calendar date (live entry or tombstone)
//! - `TriggerReadings`: optional trigger-module values recorded for a day
//! - `Weather`: categorical weather reading
//! - `EntryDraft`: the unit a client submits for a validated write

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Lowest severity rating (clear skin)
pub const MIN_SEVERITY: u8 = 1;
/// Highest severity rating (severe flare)
pub const MAX_SEVERITY: u8 = 5;
/// Lower bound shared by the ordinal trigger scales (stress, sleep quality)
pub const ORDINAL_MIN: u8 = 1;
/// Upper bound shared by the ordinal trigger scales (stress, sleep quality)
pub const ORDINAL_MAX: u8 = 5;

/// Weather category recorded for a day
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Humid,
    /// Cold, dry air (heating season)
    DryCold,
    /// Hot, dry air
    DryHeat,
    Windy,
}

impl Weather {
    /// Get all categories for iteration
    pub fn all() -> &'static [Weather] {
        &[
            Weather::Sunny,
            Weather::Cloudy,
            Weather::Rainy,
            Weather::Humid,
            Weather::DryCold,
            Weather::DryHeat,
            Weather::Windy,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Weather::Sunny => "sunny",
            Weather::Cloudy => "cloudy",
            Weather::Rainy => "rainy",
            Weather::Humid => "humid",
            Weather::DryCold => "dry_cold",
            Weather::DryHeat => "dry_heat",
            Weather::Windy => "windy",
        }
    }
}

impl std::fmt::Display for Weather {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Weather {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase().replace('-', "_");
        Weather::all()
            .iter()
            .copied()
            .find(|w| w.as_str() == wanted)
            .ok_or_else(|| {
                let names: Vec<&str> = Weather::all().iter().map(|w| w.as_str()).collect();
                format!("unknown weather '{}', expected one of: {}", s, names.join(", "))
            })
    }
}

/// Optional trigger-module values for one day
///
/// A missing reading is `None` (or an empty set), never a sentinel value.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TriggerReadings {
    /// Stress level, 1 (calm) to 5 (extreme)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_level: Option<u8>,
    /// Whether a fungal infection (e.g. tinea pedis) was active
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fungal_active: Option<bool>,
    /// Sleep quality on an inverted scale: 1 = very poor, 5 = very good
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sleep_quality: Option<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weather: Option<Weather>,
    /// Heavy sweating during the day
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sweating: Option<bool>,
    /// Contact exposures (detergents, gloves, metals, ...)
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub contact_exposures: BTreeSet<String>,
}

impl TriggerReadings {
    /// True when no trigger module recorded anything
    pub fn is_empty(&self) -> bool {
        self.stress_level.is_none()
            && self.fungal_active.is_none()
            && self.sleep_quality.is_none()
            && self.weather.is_none()
            && self.sweating.is_none()
            && self.contact_exposures.is_empty()
    }
}

/// One calendar day in the journal
///
/// The date is the natural key. A deleted day is kept as a tombstone
/// (`deleted = true`, content cleared) so the deletion carries its own
/// `updated_at` into sync conflict resolution.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayEntry {
    pub date: NaiveDate,
    /// Skin severity, 1-5. `None` when not recorded for the day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<u8>,
    /// Food identifiers consumed that day
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub foods: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub skin_notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub food_notes: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub notes: String,
    #[serde(default, skip_serializing_if = "TriggerReadings::is_empty")]
    pub triggers: TriggerReadings,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl DayEntry {
    /// Create a tombstone marking `date` as deleted at `deleted_at`
    pub fn tombstone(date: NaiveDate, created_at: DateTime<Utc>, deleted_at: DateTime<Utc>) -> Self {
        Self {
            date,
            severity: None,
            foods: BTreeSet::new(),
            skin_notes: String::new(),
            food_notes: String::new(),
            notes: String::new(),
            triggers: TriggerReadings::default(),
            deleted: true,
            created_at,
            updated_at: deleted_at,
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.deleted
    }

    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Whether this day counts as a flare day for the given threshold.
    /// Days without a severity reading are never flare days.
    pub fn is_flare(&self, flare_threshold: u8) -> bool {
        self.is_live() && self.severity.map(|s| s >= flare_threshold).unwrap_or(false)
    }
}

impl std::fmt::Display for DayEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.deleted {
            return write!(f, "{} (deleted)", self.date);
        }
        let severity = self
            .severity
            .map(|s| s.to_string())
            .unwrap_or_else(|| "-".to_string());
        let foods: Vec<&str> = self.foods.iter().map(String::as_str).collect();
        write!(
            f,
            "{} severity={} foods=[{}]",
            self.date,
            severity,
            foods.join(", ")
        )
    }
}

/// Content submitted by a client for one day
///
/// Drafts are sanitised and validated by the store before they become a
/// `DayEntry`; timestamps are always assigned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EntryDraft {
    pub date: NaiveDate,
    #[serde(default)]
    pub severity: Option<u8>,
    #[serde(default)]
    pub foods: Vec<String>,
    #[serde(default)]
    pub skin_notes: String,
    #[serde(default)]
    pub food_notes: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub triggers: TriggerReadings,
}

impl EntryDraft {
    /// Create an empty draft for a date
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            severity: None,
            foods: Vec::new(),
            skin_notes: String::new(),
            food_notes: String::new(),
            notes: String::new(),
            triggers: TriggerReadings::default(),
        }
    }

    /// Builder method: set severity
    pub fn severity(mut self, severity: u8) -> Self {
        self.severity = Some(severity);
        self
    }

    /// Builder method: add a food
    pub fn food(mut self, food: impl Into<String>) -> Self {
        self.foods.push(food.into());
        self
    }

    /// Builder method: add multiple foods
    pub fn foods<I, S>(mut self, foods: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.foods.extend(foods.into_iter().map(Into::into));
        self
    }

    pub fn stress(mut self, level: u8) -> Self {
        self.triggers.stress_level = Some(level);
        self
    }

    pub fn sleep(mut self, quality: u8) -> Self {
        self.triggers.sleep_quality = Some(quality);
        self
    }

    pub fn weather(mut self, weather: Weather) -> Self {
        self.triggers.weather = Some(weather);
        self
    }

    pub fn fungal(mut self, active: bool) -> Self {
        self.triggers.fungal_active = Some(active);
        self
    }

    pub fn sweating(mut self, sweating: bool) -> Self {
        self.triggers.sweating = Some(sweating);
        self
    }

    pub fn contact(mut self, exposure: impl Into<String>) -> Self {
        self.triggers.contact_exposures.insert(exposure.into());
        self
    }

    pub fn skin_notes(mut self, notes: impl Into<String>) -> Self {
        self.skin_notes = notes.into();
        self
    }

    pub fn food_notes(mut self, notes: impl Into<String>) -> Self {
        self.food_notes = notes.into();
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(s: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&Utc)
    }

    fn entry(date: &str, severity: Option<u8>) -> DayEntry {
        DayEntry {
            date: date.parse().unwrap(),
            severity,
            foods: BTreeSet::new(),
            skin_notes: String::new(),
            food_notes: String::new(),
            notes: String::new(),
            triggers: TriggerReadings::default(),
            deleted: false,
            created_at: ts("2026-01-01T08:00:00Z"),
            updated_at: ts("2026-01-01T08:00:00Z"),
        }
    }

    #[test]
    fn test_entry_json_shape() {
        let mut e = entry("2026-01-01", Some(2));
        e.foods.insert("Milch".to_string());
        e.triggers.stress_level = Some(4);

        let json = serde_json::to_value(&e).unwrap();
        assert_eq!(json["date"], "2026-01-01");
        assert_eq!(json["severity"], 2);
        assert_eq!(json["foods"][0], "Milch");
        assert_eq!(json["triggers"]["stress_level"], 4);
        assert_eq!(json["created_at"], "2026-01-01T08:00:00Z");

        // Absent readings are omitted rather than written as sentinels
        assert!(json.get("deleted").is_none());
        assert!(json["triggers"].get("sleep_quality").is_none());
        assert!(json.get("skin_notes").is_none());
    }

    #[test]
    fn test_minimal_entry_deserializes() {
        let e: DayEntry = serde_json::from_str(
            r#"{"date":"2026-01-03","created_at":"2026-01-03T10:00:00Z","updated_at":"2026-01-03T10:00:00Z"}"#,
        )
        .unwrap();

        assert_eq!(e.severity, None);
        assert!(e.foods.is_empty());
        assert!(e.triggers.is_empty());
        assert!(e.is_live());
    }

    #[test]
    fn test_flare_requires_reading() {
        assert!(entry("2026-01-01", Some(4)).is_flare(4));
        assert!(entry("2026-01-01", Some(5)).is_flare(4));
        assert!(!entry("2026-01-01", Some(3)).is_flare(4));
        assert!(!entry("2026-01-01", None).is_flare(1));
    }

    #[test]
    fn test_tombstone_is_never_a_flare() {
        let date = "2026-01-01".parse().unwrap();
        let t = DayEntry::tombstone(date, ts("2026-01-01T08:00:00Z"), ts("2026-01-02T08:00:00Z"));
        assert!(t.is_tombstone());
        assert!(!t.is_flare(1));
        assert_eq!(t.updated_at, ts("2026-01-02T08:00:00Z"));
        assert_eq!(serde_json::to_value(&t).unwrap()["deleted"], true);
    }

    #[test]
    fn test_weather_parse() {
        assert_eq!("dry-cold".parse::<Weather>().unwrap(), Weather::DryCold);
        assert_eq!("Sunny".parse::<Weather>().unwrap(), Weather::Sunny);
        assert!("foggy".parse::<Weather>().is_err());
        assert_eq!(serde_json::to_string(&Weather::DryHeat).unwrap(), "\"dry_heat\"");
    }

    #[test]
    fn test_draft_builder() {
        let draft = EntryDraft::new("2026-02-01".parse().unwrap())
            .severity(3)
            .food("Milch")
            .foods(["Brot", "Käse"])
            .stress(2)
            .weather(Weather::Rainy)
            .contact("Nickel");

        assert_eq!(draft.severity, Some(3));
        assert_eq!(draft.foods.len(), 3);
        assert_eq!(draft.triggers.stress_level, Some(2));
        assert_eq!(draft.triggers.weather, Some(Weather::Rainy));
        assert!(draft.triggers.contact_exposures.contains("Nickel"));
    }
}
