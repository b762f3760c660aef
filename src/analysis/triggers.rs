//! Trigger modules
//!
//! A trigger module is a class of potential trigger (food, stress, ...)
//! with a value domain. Each module can be switched on or off; the
//! correlation engine reads the current switches through
//! `TriggerSettingsSource` at the start of every analysis.

use crate::journal::types::{DayEntry, Weather, ORDINAL_MAX, ORDINAL_MIN};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Class of potential trigger
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Food,
    Stress,
    Fungal,
    Sleep,
    Weather,
    Sweating,
    Contact,
}

impl TriggerKind {
    /// Get all kinds for iteration
    pub fn all() -> &'static [TriggerKind] {
        &[
            TriggerKind::Food,
            TriggerKind::Stress,
            TriggerKind::Fungal,
            TriggerKind::Sleep,
            TriggerKind::Weather,
            TriggerKind::Sweating,
            TriggerKind::Contact,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TriggerKind::Food => "food",
            TriggerKind::Stress => "stress",
            TriggerKind::Fungal => "fungal",
            TriggerKind::Sleep => "sleep",
            TriggerKind::Weather => "weather",
            TriggerKind::Sweating => "sweating",
            TriggerKind::Contact => "contact",
        }
    }

    /// Value domain of readings for this kind
    pub fn domain(&self) -> ValueDomain {
        match self {
            TriggerKind::Food | TriggerKind::Weather | TriggerKind::Contact => {
                ValueDomain::Categorical
            }
            TriggerKind::Stress | TriggerKind::Sleep => ValueDomain::Ordinal {
                min: ORDINAL_MIN,
                max: ORDINAL_MAX,
            },
            TriggerKind::Fungal | TriggerKind::Sweating => ValueDomain::Boolean,
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Value domain of a trigger module
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ValueDomain {
    Boolean,
    Ordinal { min: u8, max: u8 },
    Categorical,
}

/// A trigger module and whether it is switched on
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct TriggerDefinition {
    pub kind: TriggerKind,
    pub domain: ValueDomain,
    pub enabled: bool,
}

/// The set of trigger modules with their on/off switches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerSet {
    enabled: BTreeMap<TriggerKind, bool>,
}

impl Default for TriggerSet {
    fn default() -> Self {
        Self::all_enabled()
    }
}

impl TriggerSet {
    pub fn all_enabled() -> Self {
        Self {
            enabled: TriggerKind::all().iter().map(|k| (*k, true)).collect(),
        }
    }

    /// Only the given kinds are switched on
    pub fn only<I>(kinds: I) -> Self
    where
        I: IntoIterator<Item = TriggerKind>,
    {
        let on: BTreeSet<TriggerKind> = kinds.into_iter().collect();
        Self {
            enabled: TriggerKind::all()
                .iter()
                .map(|k| (*k, on.contains(k)))
                .collect(),
        }
    }

    /// Builder method: switch a module on or off
    pub fn set(mut self, kind: TriggerKind, enabled: bool) -> Self {
        self.enabled.insert(kind, enabled);
        self
    }

    pub fn is_enabled(&self, kind: TriggerKind) -> bool {
        self.enabled.get(&kind).copied().unwrap_or(false)
    }

    pub fn definitions(&self) -> Vec<TriggerDefinition> {
        TriggerKind::all()
            .iter()
            .map(|k| TriggerDefinition {
                kind: *k,
                domain: k.domain(),
                enabled: self.is_enabled(*k),
            })
            .collect()
    }
}

/// Supplies the current trigger-module switches
///
/// Read once per analysis so a settings change takes effect on the next
/// run without restarting the engine.
pub trait TriggerSettingsSource: Send + Sync {
    fn current(&self) -> TriggerSet;
}

impl TriggerSettingsSource for TriggerSet {
    fn current(&self) -> TriggerSet {
        self.clone()
    }
}

impl TriggerSettingsSource for std::sync::RwLock<TriggerSet> {
    fn current(&self) -> TriggerSet {
        match self.read() {
            Ok(set) => set.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

/// A concrete trigger value observed on a day
#[derive(Debug, Clone, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum TriggerValue {
    Food(String),
    Stress(u8),
    Fungal(bool),
    Sleep(u8),
    Weather(Weather),
    Sweating(bool),
    Contact(String),
}

impl TriggerValue {
    pub fn kind(&self) -> TriggerKind {
        match self {
            TriggerValue::Food(_) => TriggerKind::Food,
            TriggerValue::Stress(_) => TriggerKind::Stress,
            TriggerValue::Fungal(_) => TriggerKind::Fungal,
            TriggerValue::Sleep(_) => TriggerKind::Sleep,
            TriggerValue::Weather(_) => TriggerKind::Weather,
            TriggerValue::Sweating(_) => TriggerKind::Sweating,
            TriggerValue::Contact(_) => TriggerKind::Contact,
        }
    }

    /// Human-readable label, e.g. `Milch` or `stress=4`
    pub fn label(&self) -> String {
        match self {
            TriggerValue::Food(name) => name.clone(),
            TriggerValue::Stress(v) => format!("stress={}", v),
            TriggerValue::Fungal(v) => format!("fungal={}", v),
            TriggerValue::Sleep(v) => format!("sleep={}", v),
            TriggerValue::Weather(w) => format!("weather={}", w),
            TriggerValue::Sweating(v) => format!("sweating={}", v),
            TriggerValue::Contact(name) => format!("contact={}", name),
        }
    }
}

impl std::fmt::Display for TriggerValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label())
    }
}

/// Every trigger value present on a day, each at most once
pub fn observed_values(entry: &DayEntry) -> BTreeSet<TriggerValue> {
    let mut values: BTreeSet<TriggerValue> = entry
        .foods
        .iter()
        .map(|f| TriggerValue::Food(f.clone()))
        .collect();

    let t = &entry.triggers;
    if let Some(v) = t.stress_level {
        values.insert(TriggerValue::Stress(v));
    }
    if let Some(v) = t.fungal_active {
        values.insert(TriggerValue::Fungal(v));
    }
    if let Some(v) = t.sleep_quality {
        values.insert(TriggerValue::Sleep(v));
    }
    if let Some(w) = t.weather {
        values.insert(TriggerValue::Weather(w));
    }
    if let Some(v) = t.sweating {
        values.insert(TriggerValue::Sweating(v));
    }
    values.extend(
        t.contact_exposures
            .iter()
            .map(|c| TriggerValue::Contact(c.clone())),
    );
    values
}
