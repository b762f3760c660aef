//! Export and import of journal entries
//!
//! - CSV: one row per live day, `;`-delimited so free-text notes containing
//!   commas stay readable in spreadsheet tools
//! - JSON: an array of full entry objects
//!
//! Imports go through [`EntryStore::upsert`], so every row is sanitised and
//! validated like any other edit. Rows that cannot be used are skipped and
//! reported, never written.

use crate::journal::{DayEntry, EntryDraft, EntryIssue, EntryStore, JournalError, Weather};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::io::{Read, Write};
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Journal error: {0}")]
    Journal(#[from] JournalError),

    #[error("Missing column: {0}")]
    MissingColumn(&'static str),

    #[error("Unsupported import: {0}")]
    Unsupported(String),

    #[error("Export is not valid UTF-8")]
    Encoding,
}

/// File format for export and import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Csv,
    Json,
}

impl ExportFormat {
    /// Guess the format from a file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        ext.parse().ok()
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(format!("unknown format '{}', expected csv or json", other)),
        }
    }
}

/// Outcome of an import
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ImportReport {
    /// Dates written to the journal
    pub imported: Vec<NaiveDate>,
    /// Rows or records that were not written, and why
    pub skipped: Vec<EntryIssue>,
}

impl ImportReport {
    fn skip(&mut self, key: impl Into<String>, reason: impl Into<String>) {
        self.skipped.push(EntryIssue::new(key, reason));
    }

    /// Save a draft, recording a validation failure as a skipped row
    async fn save(
        &mut self,
        store: &EntryStore,
        key: String,
        draft: EntryDraft,
    ) -> Result<(), ExportError> {
        match store.upsert(draft).await {
            Ok(entry) => self.imported.push(entry.date),
            Err(JournalError::InvalidEntry { reasons, .. }) => self.skip(key, reasons.join("; ")),
            Err(e) => return Err(e.into()),
        }
        Ok(())
    }
}

pub const HEADER: [&str; 15] = [
    "date",
    "weekday",
    "severity",
    "foods",
    "stress",
    "sleep",
    "weather",
    "fungal",
    "sweating",
    "contacts",
    "skin_notes",
    "food_notes",
    "notes",
    "created_at",
    "updated_at",
];

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

fn yes_no(value: Option<bool>) -> String {
    match value {
        Some(true) => "yes".to_string(),
        Some(false) => "no".to_string(),
        None => String::new(),
    }
}

fn join(items: &BTreeSet<String>) -> String {
    items.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

fn row(entry: &DayEntry) -> [String; 15] {
    let t = &entry.triggers;
    [
        entry.date.to_string(),
        entry.date.format("%A").to_string(),
        opt(entry.severity),
        join(&entry.foods),
        opt(t.stress_level),
        opt(t.sleep_quality),
        opt(t.weather),
        yes_no(t.fungal_active),
        yes_no(t.sweating),
        join(&t.contact_exposures),
        entry.skin_notes.clone(),
        entry.food_notes.clone(),
        entry.notes.clone(),
        entry.created_at.to_rfc3339(),
        entry.updated_at.to_rfc3339(),
    ]
}

/// Write live entries in date order. Returns the number of rows written.
pub fn write_csv<W: Write>(entries: &[DayEntry], writer: W) -> Result<usize, ExportError> {
    let mut live: Vec<&DayEntry> = entries.iter().filter(|e| e.is_live()).collect();
    live.sort_by_key(|e| e.date);

    let mut csv = csv::WriterBuilder::new().delimiter(b';').from_writer(writer);
    csv.write_record(HEADER)?;
    for entry in &live {
        csv.write_record(row(entry))?;
    }
    csv.flush()?;

    tracing::debug!(rows = live.len(), "Exported entries to CSV");
    Ok(live.len())
}

pub fn to_csv_string(entries: &[DayEntry]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(entries, &mut buf)?;
    String::from_utf8(buf).map_err(|_| ExportError::Encoding)
}

/// Write live entries in date order as a JSON array
pub fn write_json<W: Write>(entries: &[DayEntry], writer: W) -> Result<usize, ExportError> {
    let mut live: Vec<&DayEntry> = entries.iter().filter(|e| e.is_live()).collect();
    live.sort_by_key(|e| e.date);

    serde_json::to_writer_pretty(writer, &live)?;
    tracing::debug!(rows = live.len(), "Exported entries to JSON");
    Ok(live.len())
}

pub fn to_json_string(entries: &[DayEntry]) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_json(entries, &mut buf)?;
    String::from_utf8(buf).map_err(|_| ExportError::Encoding)
}

pub fn write_entries<W: Write>(
    entries: &[DayEntry],
    format: ExportFormat,
    writer: W,
) -> Result<usize, ExportError> {
    match format {
        ExportFormat::Csv => write_csv(entries, writer),
        ExportFormat::Json => write_json(entries, writer),
    }
}

const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%d.%m.%Y", "%d/%m/%Y"];

/// Column names accepted on import, own header first
const COLUMN_ALIASES: [(&str, &[&str]); 12] = [
    ("date", &["date", "datum"]),
    ("severity", &["severity", "schweregrad", "schwere"]),
    ("foods", &["foods", "lebensmittel"]),
    ("stress", &["stress"]),
    ("sleep", &["sleep", "schlaf"]),
    ("weather", &["weather", "wetter"]),
    ("fungal", &["fungal"]),
    ("sweating", &["sweating"]),
    ("contacts", &["contacts"]),
    ("skin_notes", &["skin_notes"]),
    ("food_notes", &["food_notes"]),
    ("notes", &["notes", "notizen"]),
];

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("unreadable date '{}'", value))
}

fn parse_level(name: &str, value: &str) -> Result<Option<u8>, String> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|_| format!("{} '{}' is not a number", name, value))
}

fn parse_flag(name: &str, value: &str) -> Result<Option<bool>, String> {
    match value.to_lowercase().as_str() {
        "" => Ok(None),
        "yes" | "true" | "ja" | "1" => Ok(Some(true)),
        "no" | "false" | "nein" | "0" => Ok(Some(false)),
        _ => Err(format!("{} '{}' is not yes or no", name, value)),
    }
}

fn split_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

/// Header positions by canonical column name
struct Columns(HashMap<&'static str, usize>);

impl Columns {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, ExportError> {
        let mut found = HashMap::new();
        for (index, header) in headers.iter().enumerate() {
            let header = header.trim().to_lowercase();
            let canonical = COLUMN_ALIASES
                .iter()
                .find(|(_, aliases)| aliases.contains(&header.as_str()))
                .map(|(name, _)| *name);
            if let Some(name) = canonical {
                found.entry(name).or_insert(index);
            }
        }
        if !found.contains_key("date") {
            return Err(ExportError::MissingColumn("date"));
        }
        Ok(Self(found))
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, name: &str) -> &'r str {
        self.0
            .get(name)
            .and_then(|i| record.get(*i))
            .map(str::trim)
            .unwrap_or("")
    }

    fn draft(&self, record: &csv::StringRecord) -> Result<EntryDraft, String> {
        let mut draft = EntryDraft::new(parse_date(self.get(record, "date"))?)
            .foods(split_list(self.get(record, "foods")));
        draft.severity = parse_level("severity", self.get(record, "severity"))?;
        draft.triggers.stress_level = parse_level("stress", self.get(record, "stress"))?;
        draft.triggers.sleep_quality = parse_level("sleep", self.get(record, "sleep"))?;
        draft.triggers.weather = match self.get(record, "weather") {
            "" => None,
            w => Some(w.parse::<Weather>()?),
        };
        draft.triggers.fungal_active = parse_flag("fungal", self.get(record, "fungal"))?;
        draft.triggers.sweating = parse_flag("sweating", self.get(record, "sweating"))?;
        draft.triggers.contact_exposures = split_list(self.get(record, "contacts"))
            .into_iter()
            .collect();
        draft.skin_notes = self.get(record, "skin_notes").to_string();
        draft.food_notes = self.get(record, "food_notes").to_string();
        draft.notes = self.get(record, "notes").to_string();
        Ok(draft)
    }
}

/// Import `;`-delimited CSV rows.
///
/// The header row decides the columns; only `date` is required. Dates may
/// be `YYYY-MM-DD`, `DD.MM.YYYY` or `DD/MM/YYYY`. Each row replaces the
/// entry for its date.
pub async fn import_csv<R: Read>(
    store: &EntryStore,
    reader: R,
) -> Result<ImportReport, ExportError> {
    let mut csv = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(reader);
    let columns = Columns::from_headers(csv.headers()?)?;
    let mut report = ImportReport::default();

    for (index, result) in csv.records().enumerate() {
        // Header is line 1
        let key = format!("line {}", index + 2);
        let record = match result {
            Ok(record) => record,
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                report.skip(key, e.to_string());
                continue;
            }
        };
        match columns.draft(&record) {
            Ok(draft) => report.save(store, key, draft).await?,
            Err(reason) => report.skip(key, reason),
        }
    }

    tracing::info!(
        imported = report.imported.len(),
        skipped = report.skipped.len(),
        "Imported CSV"
    );
    Ok(report)
}

/// Import entries from JSON.
///
/// Accepts an array of entry objects (the JSON export), a single entry
/// object, or a date-keyed object (the journal file and its backups).
/// Deleted records are skipped.
pub async fn import_json<R: Read>(
    store: &EntryStore,
    mut reader: R,
) -> Result<ImportReport, ExportError> {
    let mut content = String::new();
    reader.read_to_string(&mut content)?;

    let records: Vec<(String, Option<String>, Value)> = match serde_json::from_str::<Value>(&content)? {
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, item)| (format!("#{}", i + 1), None, item))
            .collect(),
        Value::Object(map) if map.contains_key("date") => {
            vec![("#1".to_string(), None, Value::Object(map))]
        }
        Value::Object(map) => map
            .into_iter()
            .map(|(key, item)| (key.clone(), Some(key), item))
            .collect(),
        other => {
            return Err(ExportError::Unsupported(format!(
                "expected an array or object, found {}",
                other
            )))
        }
    };

    let mut report = ImportReport::default();
    for (key, expected_date, item) in records {
        if item.get("deleted").and_then(Value::as_bool) == Some(true) {
            report.skip(key, "deleted record");
            continue;
        }
        let draft: EntryDraft = match serde_json::from_value(item) {
            Ok(draft) => draft,
            Err(e) => {
                report.skip(key, format!("malformed entry: {}", e));
                continue;
            }
        };
        if let Some(expected) = expected_date {
            if draft.date.to_string() != expected {
                report.skip(key, format!("entry date {} does not match key", draft.date));
                continue;
            }
        }
        report.save(store, key, draft).await?;
    }

    tracing::info!(
        imported = report.imported.len(),
        skipped = report.skipped.len(),
        "Imported JSON"
    );
    Ok(report)
}

pub async fn import_entries<R: Read>(
    store: &EntryStore,
    format: ExportFormat,
    reader: R,
) -> Result<ImportReport, ExportError> {
    match format {
        ExportFormat::Csv => import_csv(store, reader).await,
        ExportFormat::Json => import_json(store, reader).await,
    }
}
