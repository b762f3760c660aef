//! Correlation Engine
//!
//! For each trigger value observed in the journal, estimates the probability
//! that a flare day follows within a short lookahead window:
//!
//! ```text
//! occurrence      = a day D on which the value was recorded (once per day)
//! flare-follow    = some day in (D, D + window_days] has severity >= threshold
//! probability     = flare-follows / occurrences
//! ```
//!
//! `analyze` is a pure function of its inputs. `CorrelationEngine` wraps it
//! with a consistent store snapshot and the current trigger settings.

use crate::analysis::error::{AnalysisError, AnalysisResult};
use crate::analysis::triggers::{observed_values, TriggerSet, TriggerSettingsSource, TriggerValue};
use crate::journal::error::EntryIssue;
use crate::journal::store::EntryStore;
use crate::journal::types::{DayEntry, MAX_SEVERITY, MIN_SEVERITY};
use crate::journal::validation::validate_entry;
use chrono::{Days, NaiveDate};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// Probabilities strictly above this are classified as `Band::Trigger`
pub const TRIGGER_THRESHOLD: f64 = 0.50;
/// Probabilities at or above this (and not above `TRIGGER_THRESHOLD`) are `Band::Watch`
pub const WATCH_THRESHOLD: f64 = 0.25;

pub const DEFAULT_WINDOW_DAYS: u32 = 2;
pub const MIN_WINDOW_DAYS: u32 = 1;
pub const MAX_WINDOW_DAYS: u32 = 5;
pub const DEFAULT_FLARE_THRESHOLD: u8 = 4;
/// Occurrences needed before a probability is reported
pub const DEFAULT_MIN_SAMPLE_SIZE: u32 = 3;

/// Flare events kept per trigger value for display
const MAX_EXAMPLES: usize = 5;

/// Classification of a trigger value by flare probability
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Band {
    /// Probability > 0.50
    Trigger,
    /// 0.25 <= probability <= 0.50
    Watch,
    /// Probability < 0.25
    Tolerated,
}

impl Band {
    pub fn classify(probability: f64) -> Band {
        if probability > TRIGGER_THRESHOLD {
            Band::Trigger
        } else if probability >= WATCH_THRESHOLD {
            Band::Watch
        } else {
            Band::Tolerated
        }
    }

    /// Display color shared by every client
    pub fn color(&self) -> &'static str {
        match self {
            Band::Trigger => "red",
            Band::Watch => "orange",
            Band::Tolerated => "green",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Band::Trigger => "trigger",
            Band::Watch => "watch",
            Band::Tolerated => "tolerated",
        }
    }

    pub fn all() -> &'static [Band] {
        &[Band::Trigger, Band::Watch, Band::Tolerated]
    }
}

impl std::fmt::Display for Band {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The fixed band boundaries, for clients that color-code results
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct BandThresholds {
    /// `Trigger` when probability is strictly above this
    pub trigger_above: f64,
    /// `Watch` when probability is at or above this
    pub watch_from: f64,
}

pub const BAND_THRESHOLDS: BandThresholds = BandThresholds {
    trigger_above: TRIGGER_THRESHOLD,
    watch_from: WATCH_THRESHOLD,
};

pub fn band_thresholds() -> BandThresholds {
    BAND_THRESHOLDS
}

/// Flare probability for one trigger value
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum Probability {
    Estimated(f64),
    /// Fewer occurrences than the minimum sample size
    InsufficientData,
}

impl Probability {
    pub fn value(&self) -> Option<f64> {
        match self {
            Probability::Estimated(p) => Some(*p),
            Probability::InsufficientData => None,
        }
    }
}

/// Validated window and flare threshold for one analysis
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AnalysisParams {
    window_days: u32,
    flare_threshold: u8,
}

impl Default for AnalysisParams {
    fn default() -> Self {
        Self {
            window_days: DEFAULT_WINDOW_DAYS,
            flare_threshold: DEFAULT_FLARE_THRESHOLD,
        }
    }
}

impl AnalysisParams {
    pub fn new(window_days: u32, flare_threshold: u8) -> AnalysisResult<Self> {
        if !(MIN_WINDOW_DAYS..=MAX_WINDOW_DAYS).contains(&window_days) {
            return Err(AnalysisError::InvalidParameter {
                name: "window_days",
                value: i64::from(window_days),
                min: i64::from(MIN_WINDOW_DAYS),
                max: i64::from(MAX_WINDOW_DAYS),
            });
        }
        if !(MIN_SEVERITY..=MAX_SEVERITY).contains(&flare_threshold) {
            return Err(AnalysisError::InvalidParameter {
                name: "flare_threshold",
                value: i64::from(flare_threshold),
                min: i64::from(MIN_SEVERITY),
                max: i64::from(MAX_SEVERITY),
            });
        }
        Ok(Self {
            window_days,
            flare_threshold,
        })
    }

    pub fn window_days(&self) -> u32 {
        self.window_days
    }

    pub fn flare_threshold(&self) -> u8 {
        self.flare_threshold
    }
}

/// Report options that do not change the statistics themselves
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct AnalysisOptions {
    pub min_sample_size: u32,
    /// Also score trigger values whose module is currently switched off
    pub include_disabled: bool,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            min_sample_size: DEFAULT_MIN_SAMPLE_SIZE,
            include_disabled: false,
        }
    }
}

/// One occurrence that was followed by a flare
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct FlareEvent {
    pub trigger_date: NaiveDate,
    /// First flare day inside the window
    pub flare_date: NaiveDate,
    pub delay_days: i64,
    pub severity: u8,
}

/// Statistics for one trigger value
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TriggerStat {
    pub trigger: TriggerValue,
    pub label: String,
    /// Whether the trigger's module is currently switched on
    pub enabled: bool,
    pub occurrences: u32,
    pub flare_follow_count: u32,
    pub probability: Probability,
    /// `None` while data is insufficient
    pub band: Option<Band>,
    /// Up to five most recent occurrences that were followed by a flare
    pub examples: Vec<FlareEvent>,
}

/// Output of one analysis run
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CorrelationReport {
    pub window_days: u32,
    pub flare_threshold: u8,
    pub min_sample_size: u32,
    pub include_disabled: bool,
    /// Live, valid entries that were analyzed
    pub entries_analyzed: usize,
    pub flare_days: usize,
    /// Sorted by probability (highest first), insufficient data last
    pub stats: Vec<TriggerStat>,
    /// Entries left out because they failed validation or repeated a date
    pub skipped: Vec<EntryIssue>,
}

impl CorrelationReport {
    pub fn get(&self, trigger: &TriggerValue) -> Option<&TriggerStat> {
        self.stats.iter().find(|s| &s.trigger == trigger)
    }

    pub fn in_band(&self, band: Band) -> impl Iterator<Item = &TriggerStat> {
        self.stats.iter().filter(move |s| s.band == Some(band))
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }
}

#[derive(Default)]
struct Tally {
    enabled: bool,
    occurrences: u32,
    follows: u32,
    examples: Vec<FlareEvent>,
}

/// First flare day in (date, date + window], if any
fn first_flare_in_window(
    days: &BTreeMap<NaiveDate, &DayEntry>,
    date: NaiveDate,
    params: AnalysisParams,
) -> Option<(NaiveDate, u8)> {
    let end = date
        .checked_add_days(Days::new(u64::from(params.window_days)))
        .unwrap_or(NaiveDate::MAX);
    days.range((Bound::Excluded(date), Bound::Included(end)))
        .find(|(_, e)| e.is_flare(params.flare_threshold))
        .and_then(|(d, e)| e.severity.map(|s| (*d, s)))
}

fn compare_stats(a: &TriggerStat, b: &TriggerStat) -> Ordering {
    let by_probability = match (a.probability.value(), b.probability.value()) {
        (Some(pa), Some(pb)) => pb.partial_cmp(&pa).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    };
    by_probability
        .then_with(|| b.occurrences.cmp(&a.occurrences))
        .then_with(|| a.trigger.cmp(&b.trigger))
}

/// Score every observed trigger value against the entry set.
///
/// Tombstones are ignored. Entries that fail validation, or repeat a date
/// already seen, are skipped and listed in the report rather than failing
/// the whole analysis.
pub fn analyze(
    entries: &[DayEntry],
    params: AnalysisParams,
    triggers: &TriggerSet,
    options: &AnalysisOptions,
) -> CorrelationReport {
    let mut skipped = Vec::new();
    let mut days: BTreeMap<NaiveDate, &DayEntry> = BTreeMap::new();

    for entry in entries.iter().filter(|e| e.is_live()) {
        if let Err(reasons) = validate_entry(entry) {
            skipped.push(EntryIssue::new(entry.date.to_string(), reasons.join("; ")));
            continue;
        }
        if days.contains_key(&entry.date) {
            skipped.push(EntryIssue::new(entry.date.to_string(), "duplicate date"));
            continue;
        }
        days.insert(entry.date, entry);
    }

    let mut tallies: BTreeMap<TriggerValue, Tally> = BTreeMap::new();
    for (date, entry) in &days {
        let flare = first_flare_in_window(&days, *date, params);

        for value in observed_values(entry) {
            let enabled = triggers.is_enabled(value.kind());
            if !enabled && !options.include_disabled {
                continue;
            }

            let tally = tallies.entry(value).or_default();
            tally.enabled = enabled;
            tally.occurrences += 1;
            if let Some((flare_date, severity)) = flare {
                tally.follows += 1;
                tally.examples.push(FlareEvent {
                    trigger_date: *date,
                    flare_date,
                    delay_days: (flare_date - *date).num_days(),
                    severity,
                });
            }
        }
    }

    let mut stats: Vec<TriggerStat> = tallies
        .into_iter()
        .map(|(trigger, tally)| {
            let probability = if tally.occurrences >= options.min_sample_size.max(1) {
                Probability::Estimated(f64::from(tally.follows) / f64::from(tally.occurrences))
            } else {
                Probability::InsufficientData
            };
            let band = probability.value().map(Band::classify);
            let mut examples = tally.examples;
            if examples.len() > MAX_EXAMPLES {
                examples.drain(..examples.len() - MAX_EXAMPLES);
            }
            examples.reverse();

            TriggerStat {
                label: trigger.label(),
                trigger,
                enabled: tally.enabled,
                occurrences: tally.occurrences,
                flare_follow_count: tally.follows,
                probability,
                band,
                examples,
            }
        })
        .collect();
    stats.sort_by(compare_stats);

    CorrelationReport {
        window_days: params.window_days,
        flare_threshold: params.flare_threshold,
        min_sample_size: options.min_sample_size,
        include_disabled: options.include_disabled,
        entries_analyzed: days.len(),
        flare_days: days
            .values()
            .filter(|e| e.is_flare(params.flare_threshold))
            .count(),
        stats,
        skipped,
    }
}

/// Runs analyses against the live entry store
pub struct CorrelationEngine {
    store: Arc<EntryStore>,
    settings: Arc<dyn TriggerSettingsSource>,
    options: AnalysisOptions,
    defaults: AnalysisParams,
}

impl CorrelationEngine {
    /// Create a new correlation engine
    pub fn new(
        store: Arc<EntryStore>,
        settings: Arc<dyn TriggerSettingsSource>,
        defaults: AnalysisParams,
        options: AnalysisOptions,
    ) -> Self {
        Self {
            store,
            settings,
            options,
            defaults,
        }
    }

    /// Analyze with the given window and threshold and the configured options
    pub async fn analyze(
        &self,
        window_days: u32,
        flare_threshold: u8,
    ) -> AnalysisResult<CorrelationReport> {
        self.analyze_with(AnalysisParams::new(window_days, flare_threshold)?, self.options)
            .await
    }

    pub async fn analyze_with(
        &self,
        params: AnalysisParams,
        options: AnalysisOptions,
    ) -> AnalysisResult<CorrelationReport> {
        let entries = self.store.entries().await;
        let triggers = self.settings.current();
        let started = std::time::Instant::now();

        let report = analyze(&entries, params, &triggers, &options);

        tracing::debug!(
            "Analyzed {} entries ({} trigger values, {} skipped) in {:?}",
            report.entries_analyzed,
            report.stats.len(),
            report.skipped.len(),
            started.elapsed()
        );
        Ok(report)
    }

    pub fn defaults(&self) -> AnalysisParams {
        self.defaults
    }

    pub fn options(&self) -> AnalysisOptions {
        self.options
    }

    pub fn triggers(&self) -> TriggerSet {
        self.settings.current()
    }

    pub fn band_thresholds(&self) -> BandThresholds {
        band_thresholds()
    }
}
