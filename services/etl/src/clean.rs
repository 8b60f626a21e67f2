//! Record cleaning: raw rows in, complete typed records out
//!
//! This stage is DETERMINISTIC: same table = same clean records, same order.
//! Per-record problems become `None` sentinels and the record is dropped by
//! the final filter; only a malformed table is an error.

use crate::dates::{self, DisplayLocale};
use crate::error::SchemaError;
use crate::ids;
use crate::records::{CellValue, CleanRecord, NormalizedRecord, RawRecord, RawTable};
use crate::reporter::Reporter;
use serde::Serialize;

/// Input columns, exact header text
pub const REQUIRED_COLUMNS: [&str; 6] = ["DATE", "POSITION", "INFO", "DECK", "DECKLIST", "STORE"];

/// Counters for the run summary
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanReport {
    pub input_rows: usize,
    pub kept_rows: usize,
    pub dropped_rows: usize,
    pub date_warnings: usize,
    pub position_warnings: usize,
}

/// Check the header and map every data row onto the required columns.
///
/// Fails before touching any row when a column is missing or there is no data.
pub fn validate_raw(table: &RawTable) -> Result<Vec<RawRecord>, SchemaError> {
    let find = |name: &str| table.headers.iter().position(|h| h.trim() == name);

    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .copied()
        .filter(|name| find(*name).is_none())
        .map(String::from)
        .collect();
    if !missing.is_empty() {
        return Err(SchemaError::MissingColumns {
            missing,
            found: table.headers.clone(),
        });
    }

    if table.rows.is_empty() {
        return Err(SchemaError::EmptyInput);
    }

    let [date, position, info, deck, decklist, store] =
        REQUIRED_COLUMNS.map(|name| find(name).unwrap_or_default());

    let cell = |row: &[CellValue], idx: usize| row.get(idx).cloned().unwrap_or(CellValue::Empty);

    Ok(table
        .rows
        .iter()
        .map(|row| RawRecord {
            date: cell(row, date),
            position: cell(row, position),
            info: cell(row, info),
            deck: cell(row, deck),
            decklist: cell(row, decklist),
            store: cell(row, store),
        })
        .collect())
}

/// Numeric coercion: numbers pass, numeric text is parsed, the rest is `None`
fn coerce_position(value: &CellValue) -> Option<f64> {
    match value {
        CellValue::Number(n) if n.is_finite() => Some(*n),
        CellValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    }
}

/// Normalize one record, in a fixed order: date, store id, deck id,
/// tournament id, position, info, display fields.
pub fn normalize_record(
    raw: &RawRecord,
    locale: &DisplayLocale,
    reporter: &dyn Reporter,
) -> NormalizedRecord {
    let date = dates::normalize_date(&raw.date, reporter);

    let store = raw.store.as_text();
    let store_id = store.as_deref().map(ids::store_id);

    let decklist = raw.decklist.as_text();
    let deck_id = ids::deck_id(decklist.as_deref());

    let tournament_id = match (date, store_id.as_deref()) {
        (Some(date), Some(store_id)) => Some(ids::tournament_id(date, store_id)),
        _ => None,
    };

    let position = coerce_position(&raw.position);
    if position.is_none() && raw.position != CellValue::Empty {
        reporter.warn(&format!("Could not convert position '{}'", raw.position));
    }

    let info = raw.info.as_text();
    let display = date.map(|d| dates::display(d, locale));

    NormalizedRecord {
        date,
        position,
        info,
        deck: raw.deck.as_text(),
        decklist,
        store,
        store_id,
        deck_id,
        tournament_id,
        display,
    }
}

/// Clean every record and drop the incomplete ones.
/// Survivors keep their relative input order.
pub fn clean_records(
    raw: &[RawRecord],
    locale: &DisplayLocale,
    reporter: &dyn Reporter,
) -> (Vec<CleanRecord>, CleanReport) {
    reporter.info("Starting data cleaning");

    let mut report = CleanReport {
        input_rows: raw.len(),
        ..CleanReport::default()
    };

    let mut clean = Vec::with_capacity(raw.len());
    for record in raw {
        let normalized = normalize_record(record, locale, reporter);
        if normalized.date.is_none() && record.date != CellValue::Empty {
            report.date_warnings += 1;
        }
        if normalized.position.is_none() && record.position != CellValue::Empty {
            report.position_warnings += 1;
        }
        if let Some(record) = normalized.into_clean() {
            clean.push(record);
        }
    }

    report.kept_rows = clean.len();
    report.dropped_rows = report.input_rows - report.kept_rows;
    reporter.info(&format!(
        "Records removed for missing data: {}",
        report.dropped_rows
    ));

    (clean, report)
}
