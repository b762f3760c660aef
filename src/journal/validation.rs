//! Entry sanitising and validation
//!
//! Sanitisers normalise free text coming from clients; `validate_entry`
//! checks the structural invariants every stored `DayEntry` must satisfy.

use crate::journal::types::{DayEntry, MAX_SEVERITY, MIN_SEVERITY, ORDINAL_MAX, ORDINAL_MIN};
use chrono::NaiveDate;
use regex::Regex;
use std::collections::BTreeSet;
use std::sync::OnceLock;

/// Maximum number of foods or contact exposures per day
pub const MAX_ITEMS_PER_DAY: usize = 50;
/// Minimum length of a food or exposure name, in characters
pub const MIN_ITEM_LEN: usize = 2;
/// Maximum length of a food or exposure name, in characters
pub const MAX_ITEM_LEN: usize = 50;
/// Maximum length of each notes field, in characters
pub const MAX_NOTES_LEN: usize = 1000;

const FORBIDDEN_ITEM_CHARS: &[char] = &['<', '>', '{', '}', '[', ']', '\\'];

fn whitespace_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("static regex"))
}

fn blank_line_run() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\n{3,}").expect("static regex"))
}

/// Earliest date the journal accepts
pub fn earliest_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2000, 1, 1).unwrap_or(NaiveDate::MIN)
}

/// Normalise a food or exposure name: trim, collapse inner whitespace,
/// capitalise the first letter
pub fn sanitize_item(raw: &str) -> String {
    let collapsed = whitespace_run().replace_all(raw.trim(), " ");
    let mut chars = collapsed.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Sanitise a list of names, dropping empties and case-insensitive
/// duplicates (the first spelling wins)
pub fn sanitize_items<I, S>(items: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = BTreeSet::new();
    let mut out = BTreeSet::new();
    for item in items {
        let clean = sanitize_item(item.as_ref());
        if clean.is_empty() {
            continue;
        }
        if seen.insert(clean.to_lowercase()) {
            out.insert(clean);
        }
    }
    out
}

/// Trim notes and collapse runs of blank lines
pub fn sanitize_notes(raw: &str) -> String {
    let normalized = raw.replace("\r\n", "\n");
    blank_line_run()
        .replace_all(normalized.trim(), "\n\n")
        .into_owned()
}

/// Check a single food or exposure name
pub fn validate_item(kind: &str, item: &str) -> Result<(), String> {
    let len = item.chars().count();
    if len < MIN_ITEM_LEN {
        return Err(format!("{} '{}' is shorter than {} characters", kind, item, MIN_ITEM_LEN));
    }
    if len > MAX_ITEM_LEN {
        return Err(format!("{} '{}' is longer than {} characters", kind, item, MAX_ITEM_LEN));
    }
    if item.contains(FORBIDDEN_ITEM_CHARS) {
        return Err(format!("{} '{}' contains forbidden characters", kind, item));
    }
    Ok(())
}

fn check_range(errors: &mut Vec<String>, field: &str, value: Option<u8>, min: u8, max: u8) {
    if let Some(v) = value {
        if v < min || v > max {
            errors.push(format!("{} {} out of range {}-{}", field, v, min, max));
        }
    }
}

fn check_items(errors: &mut Vec<String>, kind: &str, items: &BTreeSet<String>) {
    if items.len() > MAX_ITEMS_PER_DAY {
        errors.push(format!(
            "{} {} entries, at most {} allowed",
            items.len(),
            kind,
            MAX_ITEMS_PER_DAY
        ));
    }
    let mut lowered = BTreeSet::new();
    for item in items {
        if let Err(e) = validate_item(kind, item) {
            errors.push(e);
        }
        if !lowered.insert(item.to_lowercase()) {
            errors.push(format!("duplicate {} '{}'", kind, item));
        }
    }
}

fn check_notes(errors: &mut Vec<String>, field: &str, text: &str) {
    let len = text.chars().count();
    if len > MAX_NOTES_LEN {
        errors.push(format!("{} has {} characters, at most {} allowed", field, len, MAX_NOTES_LEN));
    }
}

/// Validate an entry against the stored-record invariants.
///
/// Returns every violation found rather than stopping at the first.
pub fn validate_entry(entry: &DayEntry) -> Result<(), Vec<String>> {
    let mut errors = Vec::new();

    if entry.date < earliest_date() {
        errors.push(format!("date {} is before {}", entry.date, earliest_date()));
    }
    if entry.updated_at < entry.created_at {
        errors.push("updated_at precedes created_at".to_string());
    }

    if entry.is_live() {
        check_range(&mut errors, "severity", entry.severity, MIN_SEVERITY, MAX_SEVERITY);
        check_range(
            &mut errors,
            "stress_level",
            entry.triggers.stress_level,
            ORDINAL_MIN,
            ORDINAL_MAX,
        );
        check_range(
            &mut errors,
            "sleep_quality",
            entry.triggers.sleep_quality,
            ORDINAL_MIN,
            ORDINAL_MAX,
        );
        check_items(&mut errors, "food", &entry.foods);
        check_items(&mut errors, "contact exposure", &entry.triggers.contact_exposures);
        check_notes(&mut errors, "skin_notes", &entry.skin_notes);
        check_notes(&mut errors, "food_notes", &entry.food_notes);
        check_notes(&mut errors, "notes", &entry.notes);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::journal::types::TriggerReadings;
    use chrono::{TimeZone, Utc};

    fn live(date: NaiveDate) -> DayEntry {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 9, 0, 0).unwrap();
        DayEntry {
            date,
            severity: Some(3),
            foods: BTreeSet::new(),
            skin_notes: String::new(),
            food_notes: String::new(),
            notes: String::new(),
            triggers: TriggerReadings::default(),
            deleted: false,
            created_at: at,
            updated_at: at,
        }
    }

    fn day(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn test_sanitize_item() {
        assert_eq!(sanitize_item("  milch  "), "Milch");
        assert_eq!(sanitize_item("rote   \t beete"), "Rote beete");
        assert_eq!(sanitize_item("äpfel"), "Äpfel");
        assert_eq!(sanitize_item("   "), "");
    }

    #[test]
    fn test_sanitize_items_dedupes_case_insensitively() {
        let items = sanitize_items(["milch", "Milch ", "MILCH", "brot", ""]);
        assert_eq!(items.len(), 2);
        assert!(items.contains("Milch"));
        assert!(items.contains("Brot"));
    }

    #[test]
    fn test_sanitize_notes() {
        assert_eq!(sanitize_notes("  a\n\n\n\nb  "), "a\n\nb");
        assert_eq!(sanitize_notes("x\r\ny"), "x\ny");
    }

    #[test]
    fn test_validate_item() {
        assert!(validate_item("food", "Ei").is_ok());
        assert!(validate_item("food", "E").is_err());
        assert!(validate_item("food", &"a".repeat(51)).is_err());
        assert!(validate_item("food", "<script>").is_err());
    }

    #[test]
    fn test_valid_entry() {
        let mut entry = live(day("2026-01-05"));
        entry.foods.insert("Milch".into());
        entry.triggers.stress_level = Some(5);
        assert!(validate_entry(&entry).is_ok());
    }

    #[test]
    fn test_collects_all_violations() {
        let mut entry = live(day("1999-12-31"));
        entry.severity = Some(9);
        entry.triggers.sleep_quality = Some(0);
        entry.notes = "x".repeat(MAX_NOTES_LEN + 1);

        let errors = validate_entry(&entry).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.iter().any(|e| e.starts_with("severity 9")));
        assert!(errors.iter().any(|e| e.starts_with("sleep_quality 0")));
    }

    #[test]
    fn test_too_many_foods() {
        let mut entry = live(day("2026-01-05"));
        for i in 0..=MAX_ITEMS_PER_DAY {
            entry.foods.insert(format!("Food {}", i));
        }
        assert!(validate_entry(&entry).is_err());
    }

    #[test]
    fn test_timestamps_must_be_ordered() {
        let mut entry = live(day("2026-01-05"));
        entry.updated_at = entry.created_at - chrono::Duration::seconds(1);
        assert!(validate_entry(&entry).is_err());
    }

    #[test]
    fn test_tombstone_skips_content_checks() {
        let mut entry = live(day("2026-01-05"));
        entry.deleted = true;
        entry.severity = Some(42);
        assert!(validate_entry(&entry).is_ok());
    }
}
