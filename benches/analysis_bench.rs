//! Benchmarks for trigger analysis and sync reconciliation
//!
//! Run with: cargo bench

use chrono::{Duration, NaiveDate, TimeZone, Utc};
use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use flaretrack::analysis::{analyze, AnalysisOptions, AnalysisParams, TriggerSet};
use flaretrack::journal::{DayEntry, TriggerReadings, Weather};
use flaretrack::sync::{reconcile, Snapshot};

const FOODS: [&str; 12] = [
    "Milk", "Eggs", "Wheat", "Tomato", "Peanuts", "Citrus", "Chocolate", "Coffee", "Rice",
    "Chicken", "Fish", "Soy",
];

/// Deterministic pseudo-random journal spanning `days` days
fn synthetic_journal(days: usize) -> Vec<DayEntry> {
    let start = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
    let created = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
    let mut seed: u64 = 0x5eed;
    let mut next = move || {
        seed = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (seed >> 33) as usize
    };

    (0..days)
        .map(|i| {
            let foods = (0..1 + next() % 4)
                .map(|_| FOODS[next() % FOODS.len()].to_string())
                .collect();
            let weather = Weather::all()[next() % Weather::all().len()];
            DayEntry {
                date: start + Duration::days(i as i64),
                severity: Some(1 + (next() % 5) as u8),
                foods,
                skin_notes: String::new(),
                food_notes: String::new(),
                notes: String::new(),
                triggers: TriggerReadings {
                    stress_level: Some(1 + (next() % 5) as u8),
                    sleep_quality: Some(1 + (next() % 5) as u8),
                    weather: Some(weather),
                    fungal_active: Some(next() % 7 == 0),
                    sweating: Some(next() % 3 == 0),
                    ..Default::default()
                },
                deleted: false,
                created_at: created,
                updated_at: created + Duration::minutes(i as i64),
            }
        })
        .collect()
}

fn bench_analyze(c: &mut Criterion) {
    let mut group = c.benchmark_group("analyze");
    let triggers = TriggerSet::all_enabled();
    let options = AnalysisOptions::default();

    for years in [1, 3, 5] {
        let entries = synthetic_journal(years * 365);
        group.throughput(Throughput::Elements(entries.len() as u64));

        for window in [1, 5] {
            let params = AnalysisParams::new(window, 4).unwrap();
            group.bench_function(format!("{}y_window_{}", years, window), |b| {
                b.iter(|| analyze(black_box(&entries), params, &triggers, &options))
            });
        }
    }

    group.finish();
}

fn bench_reconcile(c: &mut Criterion) {
    let mut group = c.benchmark_group("reconcile");

    for years in [1, 5] {
        let entries = synthetic_journal(years * 365);
        let local = Snapshot::from_entries(entries.clone());

        // Remote edited every third day later and deleted every tenth
        let remote = Snapshot::from_entries(entries.into_iter().enumerate().map(|(i, mut e)| {
            if i % 10 == 0 {
                DayEntry::tombstone(e.date, e.created_at, e.updated_at + Duration::hours(1))
            } else {
                if i % 3 == 0 {
                    e.severity = Some(5);
                    e.updated_at += Duration::hours(1);
                }
                e
            }
        }));

        group.throughput(Throughput::Elements(local.len() as u64));
        group.bench_function(format!("{}y", years), |b| {
            b.iter(|| reconcile(black_box(&local), black_box(&remote)))
        });

        let document = remote.to_document().unwrap();
        group.bench_function(format!("{}y_decode", years), |b| {
            b.iter(|| Snapshot::from_document(black_box(&document)).unwrap())
        });
    }

    group.finish();
}

criterion_group!(benches, bench_analyze, bench_reconcile);
criterion_main!(benches);
