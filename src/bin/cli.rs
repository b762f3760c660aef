//! Flaretrack CLI
//!
//! Command-line interface for the local journal:
//! - Log, show, list and delete days
//! - Run the trigger analysis, summary and severity patterns
//! - Export to CSV or JSON, import, back up
//! - Run one sync cycle

use chrono::{Duration, Local, NaiveDate};
use clap::{Parser, Subcommand};
use flaretrack::analysis::{
    compare_periods, detect_patterns, summarize, AnalysisParams, CorrelationEngine,
    CorrelationReport, JournalSummary, PatternReport, PeriodComparison, PeriodStats, Probability,
};
use flaretrack::config::Config;
use flaretrack::export::{import_entries, write_entries, ExportFormat, ImportReport};
use flaretrack::journal::{DayEntry, EntryDraft, EntryStore, JournalError, Weather};
use flaretrack::sync::SyncManager;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser)]
#[command(name = "flaretrack-cli")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Skin journal with trigger analysis")]
#[command(long_about = "Flaretrack keeps a daily skin journal, finds which foods and conditions\ntend to precede flares, and syncs the journal between devices.")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Config file (default: search the standard locations)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Journal directory (overrides the config)
    #[arg(long, global = true)]
    pub data_dir: Option<String>,

    /// Output format (table, json)
    #[arg(short, long, default_value = "table", global = true)]
    pub format: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Record a day (replaces any existing entry for the date)
    Log {
        /// Date: "today", "yesterday" or YYYY-MM-DD
        #[arg(default_value = "today")]
        date: String,
        /// Skin severity, 1 (clear) to 5 (severe)
        #[arg(short, long)]
        severity: Option<u8>,
        /// Food eaten (repeatable)
        #[arg(short = 'F', long = "food")]
        foods: Vec<String>,
        /// Stress level, 1-5
        #[arg(long)]
        stress: Option<u8>,
        /// Sleep quality, 1 (very poor) to 5 (very good)
        #[arg(long)]
        sleep: Option<u8>,
        /// Weather: sunny, cloudy, rainy, humid, dry_cold, dry_heat, windy
        #[arg(long)]
        weather: Option<Weather>,
        /// Fungal infection active (true/false)
        #[arg(long)]
        fungal: Option<bool>,
        /// Heavy sweating (true/false)
        #[arg(long)]
        sweating: Option<bool>,
        /// Contact exposure (repeatable)
        #[arg(long = "contact")]
        contacts: Vec<String>,
        #[arg(long)]
        skin_notes: Option<String>,
        #[arg(long)]
        food_notes: Option<String>,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show one day
    Show {
        #[arg(default_value = "today")]
        date: String,
    },

    /// List recent days
    List {
        /// Time range (e.g., 7d, 4w, 3m, 1y)
        #[arg(short, long, default_value = "30d")]
        last: String,
    },

    /// Delete a day
    Delete { date: String },

    /// Rank foods and conditions by flare probability
    Analyze {
        /// Days after a trigger in which a flare counts (1-5)
        #[arg(short, long)]
        window: Option<u32>,
        /// Severity that counts as a flare (1-5)
        #[arg(short, long)]
        threshold: Option<u8>,
        /// Also score switched-off trigger modules
        #[arg(long)]
        include_disabled: bool,
    },

    /// Journal statistics
    Summary {
        /// Time range (e.g., 30d); default is the whole journal
        #[arg(short, long)]
        last: Option<String>,
    },

    /// Average severity per food, nickel load, weather and sleep, plus
    /// fungal and stress patterns
    Patterns {
        /// Time range (e.g., 90d); default is the whole journal
        #[arg(short, long)]
        last: Option<String>,
    },

    /// Compare the recent period with the one before it
    Compare {
        /// Length of the recent period
        #[arg(long, default_value = "30d")]
        recent: String,
        /// Length of the period before it
        #[arg(long, default_value = "30d")]
        previous: String,
    },

    /// Export entries as CSV or JSON
    Export {
        #[arg(long)]
        start: Option<String>,
        #[arg(long)]
        end: Option<String>,
        /// Output file (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// csv or json (default: from the output extension, else csv)
        #[arg(short = 't', long = "type")]
        kind: Option<ExportFormat>,
    },

    /// Import entries from a CSV or JSON file (rows replace existing days)
    Import {
        file: PathBuf,
        /// csv or json (default: from the file extension)
        #[arg(short = 't', long = "type")]
        kind: Option<ExportFormat>,
    },

    /// Write a timestamped copy of the journal to the backups directory
    Backup,

    /// Run one sync cycle with the configured remote
    Sync,

    /// Generate default config file
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    if let Commands::Config { output } = &cli.command {
        let config = flaretrack::config::generate_default_config();
        match output {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    std::fs::create_dir_all(parent)?;
                }
                std::fs::write(path, &config)?;
                println!("Config written to {:?}", path);
            }
            None => print!("{}", config),
        }
        return Ok(());
    }

    let mut config = match &cli.config {
        Some(path) => Config::load_with_env(path)?,
        None => Config::load_default(),
    };
    if let Some(dir) = &cli.data_dir {
        config.store.data_dir = dir.clone();
    }

    let store = Arc::new(EntryStore::open(config.store_config()).await?);
    for issue in store.load_issues().await {
        eprintln!("warning: skipped stored entry {}", issue);
    }
    let json = cli.format == "json";

    match cli.command {
        Commands::Log {
            date,
            severity,
            foods,
            stress,
            sleep,
            weather,
            fungal,
            sweating,
            contacts,
            skin_notes,
            food_notes,
            notes,
        } => {
            let mut draft = EntryDraft::new(parse_day(&date)?).foods(foods);
            draft.severity = severity;
            draft.triggers.stress_level = stress;
            draft.triggers.sleep_quality = sleep;
            draft.triggers.weather = weather;
            draft.triggers.fungal_active = fungal;
            draft.triggers.sweating = sweating;
            for contact in contacts {
                draft = draft.contact(contact);
            }
            draft.skin_notes = skin_notes.unwrap_or_default();
            draft.food_notes = food_notes.unwrap_or_default();
            draft.notes = notes.unwrap_or_default();

            match store.upsert(draft).await {
                Ok(entry) => println!("Logged {}", entry),
                Err(JournalError::InvalidEntry { date, reasons }) => {
                    for reason in &reasons {
                        eprintln!("  - {}", reason);
                    }
                    return Err(format!("entry for {} rejected", date).into());
                }
                Err(e) => return Err(e.into()),
            }
        }

        Commands::Show { date } => {
            let date = parse_day(&date)?;
            let entry = store.get(date).await.ok_or(JournalError::NotFound(date))?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            } else {
                print_entry(&entry);
            }
        }

        Commands::List { last } => {
            let days = parse_days(&last)?;
            let entries = store.recent(days, today()).await;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else if entries.is_empty() {
                println!("No entries in the last {} days.", days);
                println!();
                println!("Record a day with:");
                println!("  flaretrack-cli log --severity 2 --food milk");
            } else {
                println!("{:<12} {:<10} {:<8} {}", "Date", "Weekday", "Severity", "Foods");
                println!("{}", "-".repeat(60));
                for entry in &entries {
                    let foods: Vec<&str> = entry.foods.iter().map(String::as_str).collect();
                    println!(
                        "{:<12} {:<10} {:<8} {}",
                        entry.date.to_string(),
                        entry.date.format("%A").to_string(),
                        entry
                            .severity
                            .map(|s| s.to_string())
                            .unwrap_or_else(|| "-".to_string()),
                        foods.join(", ")
                    );
                }
            }
        }

        Commands::Delete { date } => {
            let date = parse_day(&date)?;
            if !store.delete(date).await? {
                return Err(JournalError::NotFound(date).into());
            }
            println!("Deleted {}", date);
        }

        Commands::Analyze {
            window,
            threshold,
            include_disabled,
        } => {
            let defaults = config.analysis_params()?;
            let params = AnalysisParams::new(
                window.unwrap_or(defaults.window_days()),
                threshold.unwrap_or(defaults.flare_threshold()),
            )?;
            let mut options = config.analysis_options();
            options.include_disabled |= include_disabled;

            let engine = CorrelationEngine::new(
                Arc::clone(&store),
                Arc::new(config.triggers.to_trigger_set()),
                defaults,
                options,
            );
            let report = engine.analyze_with(params, options).await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }

        Commands::Summary { last } => {
            let entries = match last {
                Some(last) => store.recent(parse_days(&last)?, today()).await,
                None => store.entries().await,
            };
            let summary = summarize(&entries);
            if json {
                println!("{}", serde_json::to_string_pretty(&summary)?);
            } else {
                print_summary(&summary);
            }
        }

        Commands::Patterns { last } => {
            let entries = match last {
                Some(last) => store.recent(parse_days(&last)?, today()).await,
                None => store.entries().await,
            };
            let report = detect_patterns(&entries);
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_patterns(&report);
            }
        }

        Commands::Compare { recent, previous } => {
            let comparison = compare_periods(
                &store.entries().await,
                today(),
                parse_days(&recent)?,
                parse_days(&previous)?,
            );
            if json {
                println!("{}", serde_json::to_string_pretty(&comparison)?);
            } else {
                print_comparison(&comparison);
            }
        }

        Commands::Export {
            start,
            end,
            output,
            kind,
        } => {
            let start = start.as_deref().map(parse_day).transpose()?;
            let end = end.as_deref().map(parse_day).transpose()?;
            let entries = store
                .range(
                    start.unwrap_or(NaiveDate::MIN),
                    end.unwrap_or(NaiveDate::MAX),
                )
                .await;
            let kind = kind
                .or_else(|| output.as_deref().and_then(ExportFormat::from_path))
                .unwrap_or_default();

            match output {
                Some(path) => {
                    let file = std::fs::File::create(&path)?;
                    let rows = write_entries(&entries, kind, file)?;
                    println!("Exported {} entries to {:?}", rows, path);
                }
                None => {
                    write_entries(&entries, kind, std::io::stdout().lock())?;
                }
            }
        }

        Commands::Import { file, kind } => {
            let kind = resolve_import_format(&file, kind)?;
            let reader = std::fs::File::open(&file)?;
            let report = import_entries(&store, kind, reader).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_import(&report);
            }
        }

        Commands::Backup => {
            let path = store.create_backup().await?;
            println!("Backup written to {}", path.display());
        }

        Commands::Sync => {
            let transport = config.build_transport()?;
            let mut sync_config = config.sync_config();
            // An explicit request runs even if background sync is off
            sync_config.enabled = true;

            let manager = SyncManager::new(Arc::clone(&store), transport, sync_config);
            let outcome = manager.sync().await?;

            if json {
                println!("{}", serde_json::to_string_pretty(&outcome)?);
            } else {
                println!(
                    "Synced with {} in {}ms",
                    manager.transport_name(),
                    outcome.duration_ms
                );
                println!(
                    "  Updated locally: {}  Kept newer local: {}  Purged: {}",
                    outcome.applied.updated,
                    outcome.applied.kept_newer,
                    outcome.purged.len()
                );
                for conflict in &outcome.conflicts {
                    println!(
                        "  Conflict on {}: both copies saved at {}, kept the remote copy",
                        conflict.date, conflict.updated_at
                    );
                }
            }
        }

        // Handled before the journal is opened
        Commands::Config { .. } => {}
    }

    Ok(())
}

fn resolve_import_format(file: &Path, kind: Option<ExportFormat>) -> CliResult<ExportFormat> {
    kind.or_else(|| ExportFormat::from_path(file)).ok_or_else(|| {
        format!(
            "Cannot tell the format of {}. Use --type csv or --type json",
            file.display()
        )
        .into()
    })
}

fn today() -> NaiveDate {
    Local::now().date_naive()
}

fn parse_day(s: &str) -> CliResult<NaiveDate> {
    match s.trim().to_lowercase().as_str() {
        "today" => Ok(today()),
        "yesterday" => Ok(today() - Duration::days(1)),
        other => NaiveDate::parse_from_str(other, "%Y-%m-%d")
            .map_err(|_| format!("Invalid date: {}. Use: today, yesterday, YYYY-MM-DD", s).into()),
    }
}

/// Parse a range like "30d" into a number of days
fn parse_days(s: &str) -> CliResult<u32> {
    let s = s.trim().to_lowercase();

    if let Some(days) = s.strip_suffix('d') {
        Ok(days.parse()?)
    } else if let Some(weeks) = s.strip_suffix('w') {
        Ok(weeks.parse::<u32>()? * 7)
    } else if let Some(months) = s.strip_suffix('m') {
        Ok(months.parse::<u32>()? * 30)
    } else if let Some(years) = s.strip_suffix('y') {
        Ok(years.parse::<u32>()? * 365)
    } else {
        Err(format!("Invalid duration format: {}. Use: 7d, 4w, 3m, 1y", s).into())
    }
}

fn print_entry(entry: &DayEntry) {
    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    let t = &entry.triggers;

    println!("{} ({})", entry.date, entry.date.format("%A"));
    println!();
    println!("  Severity:  {}", or_dash(entry.severity.map(|s| s.to_string())));
    println!(
        "  Foods:     {}",
        entry.foods.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    println!("  Stress:    {}", or_dash(t.stress_level.map(|s| s.to_string())));
    println!("  Sleep:     {}", or_dash(t.sleep_quality.map(|s| s.to_string())));
    println!("  Weather:   {}", or_dash(t.weather.map(|w| w.to_string())));
    println!("  Fungal:    {}", or_dash(t.fungal_active.map(|b| b.to_string())));
    println!("  Sweating:  {}", or_dash(t.sweating.map(|b| b.to_string())));
    println!(
        "  Contacts:  {}",
        t.contact_exposures.iter().cloned().collect::<Vec<_>>().join(", ")
    );
    for (label, text) in [
        ("Skin", &entry.skin_notes),
        ("Food", &entry.food_notes),
        ("Notes", &entry.notes),
    ] {
        if !text.is_empty() {
            println!();
            println!("  {}:", label);
            for line in text.lines() {
                println!("    {}", line);
            }
        }
    }
}

fn print_report(report: &CorrelationReport) {
    println!(
        "{} days analyzed, {} flare days (severity >= {}, window {} days)",
        report.entries_analyzed, report.flare_days, report.flare_threshold, report.window_days
    );
    for issue in &report.skipped {
        println!("  skipped {}", issue);
    }
    println!();

    if report.is_empty() {
        println!("No trigger readings recorded yet.");
        return;
    }

    println!("{:<30} {:<10} {:>8} {:>12}", "Trigger", "Band", "Chance", "Flares/Days");
    println!("{}", "-".repeat(64));
    for stat in &report.stats {
        let chance = match stat.probability {
            Probability::Estimated(p) => format!("{:.0}%", p * 100.0),
            Probability::InsufficientData => "n/a".to_string(),
        };
        let band = stat
            .band
            .map(|b| b.to_string())
            .unwrap_or_else(|| "-".to_string());
        let label = if stat.enabled {
            stat.label.clone()
        } else {
            format!("{} (off)", stat.label)
        };
        println!(
            "{:<30} {:<10} {:>8} {:>12}",
            label,
            band,
            chance,
            format!("{}/{}", stat.flare_follow_count, stat.occurrences)
        );
    }
}

fn print_summary(summary: &JournalSummary) {
    println!("Entries:          {}", summary.total_entries);
    println!("Average severity: {}", fmt_avg(summary.average_severity));
    println!("Good days:        {}", summary.good_days);
    println!("Bad days:         {}", summary.bad_days);
    if let Some(kind) = summary.current_streak_kind {
        println!("Current streak:   {} {:?} days", summary.current_streak, kind);
    }
    println!("Best good streak: {}", summary.best_good_streak);
    println!("Average stress:   {}", fmt_avg(summary.average_stress));
    println!("Average sleep:    {}", fmt_avg(summary.average_sleep_quality));

    println!();
    println!("Severity distribution:");
    for (severity, count) in &summary.severity_distribution {
        println!("  {} {:<4} {}", severity, count, "#".repeat(*count as usize));
    }

    if !summary.top_foods.is_empty() {
        println!();
        println!("Top foods:");
        for food in &summary.top_foods {
            println!("  {:<24} {} days", food.food, food.days);
        }
    }
}

fn fmt_avg(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.2}", v))
        .unwrap_or_else(|| "-".into())
}

fn fmt_share(value: Option<f64>) -> String {
    value
        .map(|v| format!("{:.0}%", v * 100.0))
        .unwrap_or_else(|| "n/a".into())
}

fn print_patterns(report: &PatternReport) {
    if report.foods.is_empty() {
        println!("No food has been rated on two or more days yet.");
    } else {
        println!("{:<28} {:>6} {:>8}", "Food", "Days", "Avg");
        println!("{}", "-".repeat(44));
        for food in &report.foods {
            let name = if food.nickel_rich {
                format!("{} [Ni]", food.food)
            } else {
                food.food.clone()
            };
            println!("{:<28} {:>6} {:>8.2}", name, food.days, food.average_severity);
        }
    }

    for (title, foods) in [
        ("Potential triggers", &report.verdicts.potential_triggers),
        ("Well tolerated", &report.verdicts.safe_foods),
    ] {
        if !foods.is_empty() {
            println!();
            println!("{}:", title);
            for food in foods {
                println!("  {} (avg {:.1})", food.food, food.average_severity);
            }
        }
    }

    let nickel = &report.nickel;
    println!();
    println!(
        "Nickel: {} high-nickel days, {} followed by a flare ({})",
        nickel.high_nickel_days,
        nickel.high_nickel_flares,
        fmt_share(nickel.high_nickel_flare_probability)
    );
    for (load, avg) in &nickel.average_severity_by_load {
        println!("  {} nickel-rich foods: avg {:.2}", load, avg);
    }

    if !report.weather.is_empty() {
        println!();
        println!("Weather:");
        for (weather, avg) in &report.weather {
            println!("  {:<10} avg {:.2}", weather.to_string(), avg);
        }
    }

    if !report.sleep.same_day.is_empty() {
        println!();
        println!("Sleep quality (same day / next day):");
        for (quality, avg) in &report.sleep.same_day {
            println!(
                "  {}: {:.2} / {}",
                quality,
                avg,
                fmt_avg(report.sleep.next_day.get(quality).copied())
            );
        }
    }

    if let Some(fungal) = &report.fungal {
        println!();
        println!(
            "Fungal: {} onsets, flare after {}, peak after {} days on average",
            fungal.onsets.len(),
            fmt_share(fungal.flare_probability),
            fmt_avg(fungal.average_peak_delay_days)
        );
        println!(
            "  avg severity {} while active, {} otherwise",
            fmt_avg(fungal.fungal_active_severity),
            fmt_avg(fungal.baseline_severity)
        );
    }

    let stress = &report.stress;
    if stress.high_stress_days > 0 {
        println!();
        println!(
            "Stress: {} high-stress days, {} followed by a flare ({})",
            stress.high_stress_days,
            stress.high_stress_flares,
            fmt_share(stress.flare_probability)
        );
    }
}

fn print_period(label: &str, period: &PeriodStats) {
    println!(
        "{:<10} {} to {}  {:>3} entries  avg {}",
        label,
        period.start,
        period.end,
        period.entries,
        fmt_avg(period.average_severity)
    );
}

fn print_comparison(comparison: &PeriodComparison) {
    print_period("Recent", &comparison.recent);
    print_period("Previous", &comparison.previous);
    match comparison.change {
        Some(change) if comparison.improved => println!("Improved by {:.2}", -change),
        Some(change) => println!("Change: {:+.2}", change),
        None => println!("Not enough ratings to compare"),
    }
}

fn print_import(report: &ImportReport) {
    println!(
        "Imported {} entries, skipped {}",
        report.imported.len(),
        report.skipped.len()
    );
    for issue in &report.skipped {
        println!("  skipped {}", issue);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn cli(data_dir: &Path, args: &[&str]) -> Cli {
        let data_dir = data_dir.to_string_lossy().to_string();
        let mut argv = vec!["flaretrack-cli", "--data-dir", data_dir.as_str()];
        argv.extend_from_slice(args);
        Cli::parse_from(argv)
    }

    async fn open(data_dir: &Path) -> EntryStore {
        EntryStore::open(flaretrack::journal::StoreConfig::new(data_dir))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_delete_missing_day_is_an_error() {
        let dir = tempdir().unwrap();
        let err = run(cli(dir.path(), &["delete", "2026-01-01"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err.downcast_ref::<JournalError>(),
            Some(JournalError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_rejected_log_is_an_error() {
        let dir = tempdir().unwrap();
        let err = run(cli(dir.path(), &["log", "2026-01-01", "--severity", "9"]))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "entry for 2026-01-01 rejected");
        assert!(open(dir.path()).await.is_empty().await);

        run(cli(dir.path(), &["log", "2026-01-01", "--severity", "2"]))
            .await
            .unwrap();
        run(cli(dir.path(), &["delete", "2026-01-01"])).await.unwrap();
        assert!(open(dir.path()).await.is_empty().await);
    }

    #[tokio::test]
    async fn test_export_import_and_backup() {
        let source = tempdir().unwrap();
        run(cli(
            source.path(),
            &["log", "2026-01-01", "-s", "4", "-F", "Käse", "--stress", "5"],
        ))
        .await
        .unwrap();

        let file = source.path().join("journal.json");
        let file_arg = file.to_string_lossy().to_string();
        run(cli(source.path(), &["export", "-o", &file_arg]))
            .await
            .unwrap();
        let exported: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(exported[0]["date"], "2026-01-01");

        let target = tempdir().unwrap();
        run(cli(target.path(), &["import", &file_arg])).await.unwrap();
        let entry = open(target.path())
            .await
            .get("2026-01-01".parse().unwrap())
            .await
            .unwrap();
        assert_eq!(entry.severity, Some(4));
        assert_eq!(entry.triggers.stress_level, Some(5));

        run(cli(target.path(), &["backup"])).await.unwrap();
        let backups: Vec<_> = std::fs::read_dir(target.path().join("backups"))
            .unwrap()
            .collect();
        assert_eq!(backups.len(), 1);
    }

    #[tokio::test]
    async fn test_import_needs_known_format() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("journal.txt");
        std::fs::write(&file, "date\n2026-01-01\n").unwrap();
        let file_arg = file.to_string_lossy().to_string();

        let err = run(cli(dir.path(), &["import", &file_arg]))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("--type"));

        run(cli(dir.path(), &["import", &file_arg, "--type", "csv"]))
            .await
            .unwrap();
        assert_eq!(open(dir.path()).await.len().await, 1);
    }
}
