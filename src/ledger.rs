use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use tracing::{debug, info};

use crate::error::{BpError, Result};
use crate::models::{AggregatedPoint, LedgerEntry};

pub const DATE_COLUMN: &str = "date";
pub const CATEGORY_COLUMN: &str = "categorie";
pub const VALUE_COLUMN: &str = "valeur";

/// Formats accepted when re-reading a date typed into the editor. The source
/// file itself only uses the first one.
const EDIT_DATE_FORMATS: &[&str] = &["%d/%m/%Y", "%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y"];

/// The forecast ledger: source column order plus the parsed rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Ledger {
    pub columns: Vec<String>,
    pub entries: Vec<LedgerEntry>,
}

/// Where the three known columns sit in a header row.
#[derive(Debug, Clone, Copy)]
struct ColumnMap {
    date: usize,
    category: usize,
    value: usize,
}

impl ColumnMap {
    fn from_headers(headers: &[String]) -> Result<Self> {
        let find = |name: &str| {
            headers
                .iter()
                .position(|h| h == name)
                .ok_or_else(|| BpError::MissingColumn(name.to_string()))
        };
        Ok(Self {
            date: find(DATE_COLUMN)?,
            category: find(CATEGORY_COLUMN)?,
            value: find(VALUE_COLUMN)?,
        })
    }

    fn is_known(&self, idx: usize) -> bool {
        idx == self.date || idx == self.category || idx == self.value
    }
}

// ---------------------------------------------------------------------------
// Cell coercion
// ---------------------------------------------------------------------------

/// Day/month/year as written in the source file.
pub fn parse_date_dmy(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%d/%m/%Y").ok()
}

/// Day-first parse of an edited date cell, also accepting ISO dates.
pub fn coerce_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    EDIT_DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(raw, fmt).ok())
}

/// Lenient amount parse: tolerates spaces, a euro sign and a decimal comma.
/// Anything else becomes a missing value.
pub fn coerce_value(raw: &str) -> Option<f64> {
    let s: String = raw
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '€' && *c != '\u{202f}')
        .collect();
    if s.is_empty() {
        return None;
    }
    let s = if s.contains('.') { s } else { s.replace(',', ".") };
    s.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Cells that are not valid UTF-8 keep their readable part instead of
/// failing the whole file.
fn lossy_record(record: &csv::ByteRecord) -> csv::StringRecord {
    record
        .iter()
        .map(|f| String::from_utf8_lossy(f).into_owned())
        .collect()
}

fn entry_from_record(record: &csv::StringRecord, map: ColumnMap, width: usize) -> LedgerEntry {
    let cell = |i: usize| record.get(i).unwrap_or("");
    LedgerEntry {
        date: parse_date_dmy(cell(map.date)),
        category: cell(map.category).trim().to_string(),
        value: coerce_value(cell(map.value)),
        extra: (0..width)
            .filter(|i| !map.is_known(*i))
            .map(|i| cell(i).to_string())
            .collect(),
    }
}

// ---------------------------------------------------------------------------
// Loading
// ---------------------------------------------------------------------------

/// Parse a semicolon-separated ledger. A source without a usable header is
/// fatal; bad date or value cells become `None`.
pub fn load_ledger<R: Read>(source: R) -> Result<Ledger> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(b';')
        .flexible(true)
        .from_reader(source);

    let columns: Vec<String> = lossy_record(
        rdr.byte_headers()
            .map_err(|e| BpError::LedgerSource(e.to_string()))?,
    )
    .iter()
    .map(|h| h.trim().to_string())
    .collect();
    let map = ColumnMap::from_headers(&columns)?;
    let width = columns.len();

    let mut entries = Vec::new();
    for result in rdr.byte_records() {
        let record = lossy_record(&result.map_err(|e| BpError::LedgerSource(e.to_string()))?);
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        entries.push(entry_from_record(&record, map, width));
    }

    let missing_dates = entries.iter().filter(|e| e.date.is_none()).count();
    let missing_values = entries.iter().filter(|e| e.value.is_none()).count();
    info!(rows = entries.len(), missing_dates, missing_values, "loaded ledger");

    Ok(Ledger { columns, entries })
}

pub fn load_ledger_file(path: &Path) -> Result<Ledger> {
    let file = std::fs::File::open(path)
        .map_err(|e| BpError::LedgerSource(format!("{}: {e}", path.display())))?;
    load_ledger(std::io::BufReader::new(file))
}

/// Read rows typed into the editor. Columns are matched by name, so the edit
/// file may order them freely and may use `,` or `;` as separator.
pub fn read_edited_rows<R: Read>(columns: &[String], mut source: R) -> Result<Vec<LedgerEntry>> {
    let mut raw = Vec::new();
    source.read_to_end(&mut raw)?;
    let buf = String::from_utf8_lossy(&raw);
    let first_line = buf.lines().next().unwrap_or("");
    let delimiter = if first_line.contains(';') { b';' } else { b',' };

    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .from_reader(buf.as_bytes());
    let headers: Vec<String> = rdr.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let map = ColumnMap::from_headers(&headers)?;

    // Ledger extra column -> position in the edit file.
    let target_map = ColumnMap::from_headers(columns)?;
    let extra_sources: Vec<Option<usize>> = columns
        .iter()
        .enumerate()
        .filter(|(i, _)| !target_map.is_known(*i))
        .map(|(_, name)| headers.iter().position(|h| h == name))
        .collect();

    let mut rows = Vec::new();
    for result in rdr.records() {
        let record = result?;
        if record.iter().all(|f| f.trim().is_empty()) {
            continue;
        }
        let cell = |i: usize| record.get(i).unwrap_or("");
        let date = coerce_date(cell(map.date));
        let value = coerce_value(cell(map.value));
        if date.is_none() && !cell(map.date).trim().is_empty() {
            debug!(raw = cell(map.date), "edited date not understood");
        }
        rows.push(LedgerEntry {
            date,
            category: cell(map.category).trim().to_string(),
            value,
            extra: extra_sources
                .iter()
                .map(|src| src.map(|i| cell(i).to_string()).unwrap_or_default())
                .collect(),
        });
    }
    Ok(rows)
}

// ---------------------------------------------------------------------------
// Views and edits
// ---------------------------------------------------------------------------

impl Ledger {
    /// Distinct categories in first-seen order.
    pub fn categories(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for e in &self.entries {
            if !seen.contains(&e.category) {
                seen.push(e.category.clone());
            }
        }
        seen
    }

    pub fn filter_by_category(&self, category: &str) -> Vec<LedgerEntry> {
        filter_by_category(&self.entries, category)
    }

    /// Cells of `entry` laid out in source column order. Dates come out as
    /// ISO `YYYY-MM-DD`; missing dates and values as empty cells.
    pub fn record_for(&self, entry: &LedgerEntry) -> Vec<String> {
        let Ok(map) = ColumnMap::from_headers(&self.columns) else {
            return Vec::new();
        };
        let mut extra = entry.extra.iter();
        (0..self.columns.len())
            .map(|i| {
                if i == map.date {
                    entry.date.map(|d| d.format("%Y-%m-%d").to_string()).unwrap_or_default()
                } else if i == map.category {
                    entry.category.clone()
                } else if i == map.value {
                    entry.value.map(|v| v.to_string()).unwrap_or_default()
                } else {
                    extra.next().cloned().unwrap_or_default()
                }
            })
            .collect()
    }

    /// Columns not handled as date/category/value, in source order.
    pub fn extra_columns(&self) -> Vec<&str> {
        let Ok(map) = ColumnMap::from_headers(&self.columns) else {
            return Vec::new();
        };
        self.columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !map.is_known(*i))
            .map(|(_, c)| c.as_str())
            .collect()
    }
}

pub fn filter_by_category(entries: &[LedgerEntry], category: &str) -> Vec<LedgerEntry> {
    entries
        .iter()
        .filter(|e| e.category == category)
        .cloned()
        .collect()
}

/// Replace the `category` subset of `original` with `edited`. Rows of other
/// categories keep their positions; the edited block is spliced in where the
/// first row of the subset sat, or appended when the subset was empty.
pub fn apply_user_edits(original: &Ledger, category: &str, edited: Vec<LedgerEntry>) -> Ledger {
    let insert_at = original
        .entries
        .iter()
        .position(|e| e.category == category)
        .unwrap_or(original.entries.len());

    let replaced = original.entries.iter().filter(|e| e.category == category).count();
    let edited_len = edited.len();

    let mut entries = Vec::with_capacity(original.entries.len() - replaced + edited_len);
    let mut edited = Some(edited);
    for (i, e) in original.entries.iter().enumerate() {
        if i == insert_at {
            entries.extend(edited.take().unwrap_or_default());
        }
        if e.category != category {
            entries.push(e.clone());
        }
    }
    if let Some(rest) = edited {
        entries.extend(rest);
    }

    debug!(category, replaced, edited = edited_len, "applied user edits");
    Ledger {
        columns: original.columns.clone(),
        entries,
    }
}

/// Round a euro amount to whole thousands, halves away from zero.
pub fn to_thousands(value: f64) -> i64 {
    (value / 1000.0).round() as i64
}

/// Sum `category` values per date. Rows without a date are dropped; missing
/// values add nothing to their date's total.
pub fn aggregate_category(entries: &[LedgerEntry], category: &str) -> Vec<AggregatedPoint> {
    let mut totals: BTreeMap<NaiveDate, f64> = BTreeMap::new();
    for e in entries.iter().filter(|e| e.category == category) {
        let Some(date) = e.date else { continue };
        *totals.entry(date).or_insert(0.0) += e.value.unwrap_or(0.0);
    }
    totals
        .into_iter()
        .map(|(date, value)| {
            let value_k = to_thousands(value);
            AggregatedPoint {
                date,
                value,
                value_k,
                label: format!("{value_k} K€"),
            }
        })
        .collect()
}
