//! Trigger analysis
//!
//! - **triggers**: Trigger modules, values and the settings source
//! - **correlation**: Flare-window probability estimation and banding
//! - **summary**: Descriptive journal statistics
//! - **patterns**: Per-factor severity breakdowns and lookahead patterns
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust
//! use flaretrack::analysis::{analyze, AnalysisOptions, AnalysisParams, Band, TriggerSet};
//!
//! let report = analyze(
//!     &[],
//!     AnalysisParams::new(2, 4).unwrap(),
//!     &TriggerSet::all_enabled(),
//!     &AnalysisOptions::default(),
//! );
//! assert!(report.is_empty());
//! assert_eq!(Band::classify(0.5), Band::Watch);
//! ```

pub mod correlation;
pub mod error;
pub mod patterns;
pub mod summary;
pub mod triggers;

pub use correlation::{
    analyze, band_thresholds, AnalysisOptions, AnalysisParams, Band, BandThresholds,
    CorrelationEngine, CorrelationReport, FlareEvent, Probability, TriggerStat, BAND_THRESHOLDS,
    DEFAULT_FLARE_THRESHOLD, DEFAULT_MIN_SAMPLE_SIZE, DEFAULT_WINDOW_DAYS, MAX_WINDOW_DAYS,
    MIN_WINDOW_DAYS, TRIGGER_THRESHOLD, WATCH_THRESHOLD,
};
pub use error::{AnalysisError, AnalysisResult};
pub use patterns::{
    compare_periods, detect_patterns, food_severity, food_verdicts, fungal_pattern,
    is_nickel_rich, nickel_analysis, sleep_analysis, stress_pattern, weather_severity,
    weekday_averages, weekly_averages, FoodSeverity, FoodVerdicts, FungalOnset, FungalPattern,
    NickelAnalysis, NickelFoodCount, PatternReport, PeriodComparison, PeriodStats,
    SleepAnalysis, StressFlare, StressPattern, WeekdayAverage, WeeklyAverage,
    NICKEL_RICH_FOODS,
};
pub use summary::{summarize, FoodCount, JournalSummary, StreakKind};
pub use triggers::{
    observed_values, TriggerDefinition, TriggerKind, TriggerSet, TriggerSettingsSource,
    TriggerValue, ValueDomain,
};
