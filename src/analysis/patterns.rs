//! Severity patterns
//!
//! Per-factor severity breakdowns that complement the windowed correlation
//! report: average severity per food, nickel load, weather and sleep,
//! weekly and weekday averages, period comparison, and the fungal-onset
//! and high-stress lookahead patterns.
//!
//! All functions are pure over a slice of entries and ignore tombstones.

use chrono::{Datelike, Duration, NaiveDate, Weekday};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};

use crate::analysis::summary::{average, round2, BAD_DAY_MIN};
use crate::journal::types::{DayEntry, Weather};

/// Foods need this many rated days before they get an average
pub const MIN_FOOD_DAYS: u32 = 2;
/// Average severity at or above which a food is a potential trigger
pub const POTENTIAL_TRIGGER_MIN_AVERAGE: f64 = 3.5;
/// Average severity at or below which a food counts as well tolerated
pub const SAFE_FOOD_MAX_AVERAGE: f64 = 2.5;
/// Rated days required before a food is listed as trigger or safe
pub const FOOD_VERDICT_MIN_DAYS: u32 = 3;

/// Days with at least this many nickel-rich foods are high-nickel days
pub const HIGH_NICKEL_LOAD: u32 = 2;
/// Days after a high-nickel day (inclusive of the day itself) checked for a flare
pub const NICKEL_LOOKAHEAD_DAYS: i64 = 2;

pub const FUNGAL_LOOKAHEAD_DAYS: i64 = 14;
pub const STRESS_LOOKAHEAD_DAYS: i64 = 2;
/// Stress readings at or above this are high-stress days
pub const HIGH_STRESS_MIN: u8 = 4;
/// Lookahead patterns need at least this many live entries
pub const MIN_PATTERN_ENTRIES: usize = 5;

const WEEKLY_LIMIT: usize = 8;
const STRESS_EVENT_LIMIT: usize = 10;

/// Foods with a high nickel content, German and English names.
///
/// Matched case-insensitively against the recorded food names.
pub const NICKEL_RICH_FOODS: &[&str] = &[
    "Schokolade",
    "Kakao",
    "Haferflocken",
    "Müsli",
    "Erdnüsse",
    "Mandeln",
    "Walnüsse",
    "Haselnüsse",
    "Cashews",
    "Sonnenblumenkerne",
    "Leinsamen",
    "Soja",
    "Tofu",
    "Linsen",
    "Bohnen",
    "Erbsen",
    "Kichererbsen",
    "Spinat",
    "Grünkohl",
    "Tee",
    "Vollkornbrot",
    "Buchweizen",
    "Chocolate",
    "Cocoa",
    "Oats",
    "Peanuts",
    "Almonds",
    "Walnuts",
    "Hazelnuts",
    "Sunflower Seeds",
    "Flaxseed",
    "Soy",
    "Lentils",
    "Beans",
    "Peas",
    "Chickpeas",
    "Spinach",
    "Kale",
    "Tea",
    "Whole Wheat Bread",
    "Buckwheat",
];

pub fn is_nickel_rich(food: &str) -> bool {
    let food = food.to_lowercase();
    NICKEL_RICH_FOODS.iter().any(|n| n.to_lowercase() == food)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoodSeverity {
    pub food: String,
    /// Rated days on which the food was recorded
    pub days: u32,
    pub average_severity: f64,
    pub nickel_rich: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FoodVerdicts {
    /// Highest average first
    pub potential_triggers: Vec<FoodSeverity>,
    /// Lowest average first
    pub safe_foods: Vec<FoodSeverity>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NickelFoodCount {
    pub food: String,
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct NickelAnalysis {
    /// Average severity keyed by the number of nickel-rich foods eaten that day
    pub average_severity_by_load: BTreeMap<u32, f64>,
    pub high_nickel_days: u32,
    pub high_nickel_flares: u32,
    /// Share of high-nickel days followed by a flare, `None` without any
    pub high_nickel_flare_probability: Option<f64>,
    pub food_frequencies: Vec<NickelFoodCount>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SleepAnalysis {
    /// Average severity on the same day, keyed by sleep quality
    pub same_day: BTreeMap<u8, f64>,
    /// Average severity on the following day, keyed by sleep quality
    pub next_day: BTreeMap<u8, f64>,
    pub correlation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeeklyAverage {
    /// Monday of the week
    pub week_start: NaiveDate,
    pub average_severity: f64,
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WeekdayAverage {
    pub weekday: Weekday,
    pub average_severity: Option<f64>,
    pub days: u32,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodStats {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub entries: usize,
    pub average_severity: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PeriodComparison {
    pub recent: PeriodStats,
    pub previous: PeriodStats,
    /// Recent minus previous average, when both have ratings
    pub change: Option<f64>,
    pub improved: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FungalOnset {
    pub onset_date: NaiveDate,
    pub peak_delay_days: i64,
    pub peak_severity: u8,
    pub flare: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FungalPattern {
    pub onsets: Vec<FungalOnset>,
    pub baseline_severity: Option<f64>,
    pub fungal_active_severity: Option<f64>,
    pub average_peak_delay_days: Option<f64>,
    pub flare_probability: Option<f64>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StressFlare {
    pub stress_date: NaiveDate,
    pub stress_level: u8,
    pub flare_date: NaiveDate,
    pub delay_days: i64,
    pub severity: u8,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StressPattern {
    pub severity_by_level: BTreeMap<u8, f64>,
    pub high_stress_days: u32,
    pub high_stress_flares: u32,
    pub flare_probability: Option<f64>,
    pub correlation: Option<f64>,
    /// First few high-stress days that were followed by a flare
    pub events: Vec<StressFlare>,
}

/// Every pattern breakdown in one serialisable report
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PatternReport {
    pub foods: Vec<FoodSeverity>,
    pub verdicts: FoodVerdicts,
    pub nickel: NickelAnalysis,
    pub weather: BTreeMap<Weather, f64>,
    pub sleep: SleepAnalysis,
    pub weekly: Vec<WeeklyAverage>,
    pub weekdays: Vec<WeekdayAverage>,
    pub fungal: Option<FungalPattern>,
    pub stress: StressPattern,
}

fn live_sorted(entries: &[DayEntry]) -> Vec<&DayEntry> {
    let mut live: Vec<&DayEntry> = entries.iter().filter(|e| e.is_live()).collect();
    live.sort_by_key(|e| e.date);
    live
}

fn severity_index(live: &[&DayEntry]) -> HashMap<NaiveDate, u8> {
    live.iter()
        .filter_map(|e| e.severity.map(|s| (e.date, s)))
        .collect()
}

fn ratio(hits: u32, total: u32) -> Option<f64> {
    (total > 0).then(|| round2(f64::from(hits) / f64::from(total)))
}

/// First day in `date..=date+days` with a flare reading
fn first_flare(
    severities: &HashMap<NaiveDate, u8>,
    date: NaiveDate,
    days: i64,
) -> Option<(i64, NaiveDate, u8)> {
    (0..=days).find_map(|offset| {
        let day = date.checked_add_signed(Duration::days(offset))?;
        let severity = *severities.get(&day)?;
        (severity >= BAD_DAY_MIN).then_some((offset, day, severity))
    })
}

fn averages_by<K: Ord>(groups: BTreeMap<K, Vec<u8>>) -> BTreeMap<K, f64> {
    groups
        .into_iter()
        .filter_map(|(k, v)| average(v.into_iter()).map(|avg| (k, avg)))
        .collect()
}

/// Pearson correlation of paired readings, `None` below three pairs or
/// when either side has no variance.
pub fn correlation(pairs: &[(u8, u8)]) -> Option<f64> {
    if pairs.len() < 3 {
        return None;
    }
    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| f64::from(p.0)).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| f64::from(p.1)).sum::<f64>() / n;

    let (mut num, mut den_x, mut den_y) = (0.0, 0.0, 0.0);
    for (x, y) in pairs {
        let dx = f64::from(*x) - mean_x;
        let dy = f64::from(*y) - mean_y;
        num += dx * dy;
        den_x += dx * dx;
        den_y += dy * dy;
    }
    if den_x == 0.0 || den_y == 0.0 {
        return None;
    }
    Some(round2(num / (den_x.sqrt() * den_y.sqrt())))
}

/// Average severity per food over rated days, highest first.
///
/// Foods rated on fewer than [`MIN_FOOD_DAYS`] days are left out.
pub fn food_severity(entries: &[DayEntry]) -> Vec<FoodSeverity> {
    let mut by_food: HashMap<&str, Vec<u8>> = HashMap::new();
    for entry in entries.iter().filter(|e| e.is_live()) {
        let Some(severity) = entry.severity else {
            continue;
        };
        for food in &entry.foods {
            by_food.entry(food.as_str()).or_default().push(severity);
        }
    }

    let mut foods: Vec<FoodSeverity> = by_food
        .into_iter()
        .filter(|(_, s)| s.len() as u32 >= MIN_FOOD_DAYS)
        .filter_map(|(food, severities)| {
            let days = severities.len() as u32;
            average(severities.into_iter()).map(|average_severity| FoodSeverity {
                food: food.to_string(),
                days,
                average_severity,
                nickel_rich: is_nickel_rich(food),
            })
        })
        .collect();
    foods.sort_by(|a, b| {
        b.average_severity
            .total_cmp(&a.average_severity)
            .then_with(|| a.food.cmp(&b.food))
    });
    foods
}

/// Split foods into potential triggers and well tolerated foods
pub fn food_verdicts(foods: &[FoodSeverity]) -> FoodVerdicts {
    let potential_triggers = foods
        .iter()
        .filter(|f| {
            f.days >= FOOD_VERDICT_MIN_DAYS && f.average_severity >= POTENTIAL_TRIGGER_MIN_AVERAGE
        })
        .cloned()
        .collect();
    let mut safe_foods: Vec<FoodSeverity> = foods
        .iter()
        .filter(|f| f.days >= FOOD_VERDICT_MIN_DAYS && f.average_severity <= SAFE_FOOD_MAX_AVERAGE)
        .cloned()
        .collect();
    safe_foods.sort_by(|a, b| {
        a.average_severity
            .total_cmp(&b.average_severity)
            .then_with(|| a.food.cmp(&b.food))
    });
    FoodVerdicts {
        potential_triggers,
        safe_foods,
    }
}

pub fn nickel_analysis(entries: &[DayEntry]) -> NickelAnalysis {
    let live = live_sorted(entries);
    let severities = severity_index(&live);

    let mut by_load: BTreeMap<u32, Vec<u8>> = BTreeMap::new();
    let mut frequencies: HashMap<&str, u32> = HashMap::new();
    let mut high_nickel_days = 0;
    let mut high_nickel_flares = 0;

    for entry in &live {
        let nickel: Vec<&str> = entry
            .foods
            .iter()
            .map(String::as_str)
            .filter(|f| is_nickel_rich(f))
            .collect();
        let load = nickel.len() as u32;
        for food in nickel {
            *frequencies.entry(food).or_insert(0) += 1;
        }
        if let Some(severity) = entry.severity {
            by_load.entry(load).or_default().push(severity);
        }
        if load >= HIGH_NICKEL_LOAD {
            high_nickel_days += 1;
            if first_flare(&severities, entry.date, NICKEL_LOOKAHEAD_DAYS).is_some() {
                high_nickel_flares += 1;
            }
        }
    }

    let mut food_frequencies: Vec<NickelFoodCount> = frequencies
        .into_iter()
        .map(|(food, days)| NickelFoodCount {
            food: food.to_string(),
            days,
        })
        .collect();
    food_frequencies.sort_by(|a, b| b.days.cmp(&a.days).then_with(|| a.food.cmp(&b.food)));

    NickelAnalysis {
        average_severity_by_load: averages_by(by_load),
        high_nickel_days,
        high_nickel_flares,
        high_nickel_flare_probability: ratio(high_nickel_flares, high_nickel_days),
        food_frequencies,
    }
}

/// Average severity per weather condition
pub fn weather_severity(entries: &[DayEntry]) -> BTreeMap<Weather, f64> {
    let mut groups: BTreeMap<Weather, Vec<u8>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.is_live()) {
        if let (Some(weather), Some(severity)) = (entry.triggers.weather, entry.severity) {
            groups.entry(weather).or_default().push(severity);
        }
    }
    averages_by(groups)
}

pub fn sleep_analysis(entries: &[DayEntry]) -> SleepAnalysis {
    let live = live_sorted(entries);
    let severities = severity_index(&live);

    let mut same_day: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    let mut next_day: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    let mut pairs = Vec::new();

    for entry in &live {
        let Some(quality) = entry.triggers.sleep_quality else {
            continue;
        };
        if let Some(severity) = entry.severity {
            same_day.entry(quality).or_default().push(severity);
            pairs.push((quality, severity));
        }
        let tomorrow = entry
            .date
            .succ_opt()
            .and_then(|d| severities.get(&d).copied());
        if let Some(severity) = tomorrow {
            next_day.entry(quality).or_default().push(severity);
        }
    }

    SleepAnalysis {
        same_day: averages_by(same_day),
        next_day: averages_by(next_day),
        correlation: correlation(&pairs),
    }
}

/// Average severity per Monday-based week, most recent eight weeks
pub fn weekly_averages(entries: &[DayEntry]) -> Vec<WeeklyAverage> {
    let mut weeks: BTreeMap<NaiveDate, Vec<u8>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.is_live()) {
        let Some(severity) = entry.severity else {
            continue;
        };
        let offset = i64::from(entry.date.weekday().num_days_from_monday());
        let week_start = entry.date - Duration::days(offset);
        weeks.entry(week_start).or_default().push(severity);
    }

    let mut weekly: Vec<WeeklyAverage> = weeks
        .into_iter()
        .filter_map(|(week_start, severities)| {
            let days = severities.len() as u32;
            average(severities.into_iter()).map(|average_severity| WeeklyAverage {
                week_start,
                average_severity,
                days,
            })
        })
        .collect();
    if weekly.len() > WEEKLY_LIMIT {
        weekly.drain(..weekly.len() - WEEKLY_LIMIT);
    }
    weekly
}

/// Average severity per weekday, Monday first
pub fn weekday_averages(entries: &[DayEntry]) -> Vec<WeekdayAverage> {
    let mut days: [Vec<u8>; 7] = Default::default();
    for entry in entries.iter().filter(|e| e.is_live()) {
        if let Some(severity) = entry.severity {
            days[entry.date.weekday().num_days_from_monday() as usize].push(severity);
        }
    }

    let weekdays = std::iter::successors(Some(Weekday::Mon), |d| Some(d.succ()));
    days.into_iter()
        .zip(weekdays)
        .map(|(severities, weekday)| WeekdayAverage {
            weekday,
            days: severities.len() as u32,
            average_severity: average(severities.into_iter()),
        })
        .collect()
}

fn period_stats(live: &[&DayEntry], start: NaiveDate, end: NaiveDate) -> PeriodStats {
    let in_period: Vec<&&DayEntry> = live
        .iter()
        .filter(|e| e.date >= start && e.date <= end)
        .collect();
    PeriodStats {
        start,
        end,
        entries: in_period.len(),
        average_severity: average(in_period.iter().filter_map(|e| e.severity)),
    }
}

/// Compare the last `recent_days` up to `today` with the `previous_days`
/// immediately before them.
pub fn compare_periods(
    entries: &[DayEntry],
    today: NaiveDate,
    recent_days: u32,
    previous_days: u32,
) -> PeriodComparison {
    let live = live_sorted(entries);

    let recent_start = today
        .checked_sub_signed(Duration::days(i64::from(recent_days)))
        .unwrap_or(NaiveDate::MIN);
    let previous_end = recent_start.pred_opt().unwrap_or(NaiveDate::MIN);
    let previous_start = previous_end
        .checked_sub_signed(Duration::days(i64::from(previous_days)))
        .unwrap_or(NaiveDate::MIN);

    let recent = period_stats(&live, recent_start, today);
    let previous = period_stats(&live, previous_start, previous_end);

    let change = match (recent.average_severity, previous.average_severity) {
        (Some(r), Some(p)) => Some(round2(r - p)),
        _ => None,
    };

    PeriodComparison {
        improved: change.is_some_and(|c| c < 0.0),
        recent,
        previous,
        change,
    }
}

fn fungal_active(entry: &DayEntry) -> bool {
    entry.triggers.fungal_active == Some(true)
}

/// Severity after each day a fungal infection becomes active.
///
/// Returns `None` with fewer than [`MIN_PATTERN_ENTRIES`] live entries.
pub fn fungal_pattern(entries: &[DayEntry], look_ahead_days: i64) -> Option<FungalPattern> {
    let live = live_sorted(entries);
    if live.len() < MIN_PATTERN_ENTRIES {
        return None;
    }
    let severities = severity_index(&live);

    let mut onsets = Vec::new();
    let mut previously_active = false;
    for entry in &live {
        let is_active = fungal_active(entry);
        if is_active && !previously_active {
            let peak = (0..=look_ahead_days)
                .filter_map(|offset| {
                    let day = entry.date.checked_add_signed(Duration::days(offset))?;
                    severities.get(&day).map(|s| (offset, *s))
                })
                // Earliest day wins among equal peaks
                .fold(None, |best: Option<(i64, u8)>, (offset, s)| match best {
                    Some((_, b)) if b >= s => best,
                    _ => Some((offset, s)),
                });
            if let Some((peak_delay_days, peak_severity)) = peak {
                onsets.push(FungalOnset {
                    onset_date: entry.date,
                    peak_delay_days,
                    peak_severity,
                    flare: peak_severity >= BAD_DAY_MIN,
                });
            }
        }
        previously_active = is_active;
    }

    let flares = onsets.iter().filter(|o| o.flare).count() as u32;
    let average_peak_delay_days = (!onsets.is_empty()).then(|| {
        let total: i64 = onsets.iter().map(|o| o.peak_delay_days).sum();
        (total as f64 / onsets.len() as f64 * 10.0).round() / 10.0
    });

    Some(FungalPattern {
        baseline_severity: average(
            live.iter()
                .filter(|e| !fungal_active(e))
                .filter_map(|e| e.severity),
        ),
        fungal_active_severity: average(
            live.iter()
                .filter(|e| fungal_active(e))
                .filter_map(|e| e.severity),
        ),
        average_peak_delay_days,
        flare_probability: ratio(flares, onsets.len() as u32),
        onsets,
    })
}

/// Severity per stress level and how often high stress precedes a flare
pub fn stress_pattern(entries: &[DayEntry], delay_days: i64) -> StressPattern {
    let live = live_sorted(entries);
    let severities = severity_index(&live);

    let mut by_level: BTreeMap<u8, Vec<u8>> = BTreeMap::new();
    let mut pairs = Vec::new();
    let mut high_stress_days = 0;
    let mut events = Vec::new();

    for entry in &live {
        let Some(level) = entry.triggers.stress_level else {
            continue;
        };
        if let Some(severity) = entry.severity {
            by_level.entry(level).or_default().push(severity);
            pairs.push((level, severity));
        }
        if level < HIGH_STRESS_MIN {
            continue;
        }
        high_stress_days += 1;
        if let Some((delay, flare_date, severity)) = first_flare(&severities, entry.date, delay_days)
        {
            events.push(StressFlare {
                stress_date: entry.date,
                stress_level: level,
                flare_date,
                delay_days: delay,
                severity,
            });
        }
    }

    let high_stress_flares = events.len() as u32;
    events.truncate(STRESS_EVENT_LIMIT);

    StressPattern {
        severity_by_level: averages_by(by_level),
        high_stress_days,
        high_stress_flares,
        flare_probability: ratio(high_stress_flares, high_stress_days),
        correlation: correlation(&pairs),
        events,
    }
}

/// Run every breakdown with the default lookahead windows
pub fn detect_patterns(entries: &[DayEntry]) -> PatternReport {
    let foods = food_severity(entries);
    PatternReport {
        verdicts: food_verdicts(&foods),
        foods,
        nickel: nickel_analysis(entries),
        weather: weather_severity(entries),
        sleep: sleep_analysis(entries),
        weekly: weekly_averages(entries),
        weekdays: weekday_averages(entries),
        fungal: fungal_pattern(entries, FUNGAL_LOOKAHEAD_DAYS),
        stress: stress_pattern(entries, STRESS_LOOKAHEAD_DAYS),
    }
}
