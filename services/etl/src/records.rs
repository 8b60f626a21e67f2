//! Typed records for each pipeline stage
//!
//! raw cells -> `RawRecord` -> `NormalizedRecord` -> `CleanRecord` -> star schema rows

use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::fmt;

/// One spreadsheet cell, reduced to the shapes the pipeline cares about
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Number(f64),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// Trimmed text content; blank text and empty cells are `None`.
    /// Numbers render without a trailing `.0` when integral.
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => {
                let trimmed = s.trim();
                (!trimmed.is_empty()).then(|| trimmed.to_string())
            }
            CellValue::Number(n) if n.fract() == 0.0 && n.abs() < 1e15 => {
                Some(format!("{}", *n as i64))
            }
            CellValue::Number(n) => Some(n.to_string()),
            CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Empty => write!(f, "<empty>"),
            CellValue::Text(s) => write!(f, "{}", s),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::DateTime(dt) => write!(f, "{}", dt),
        }
    }
}

/// Header row plus data rows, straight from the input file
#[derive(Debug, Clone, Default)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

/// One input row mapped onto the required columns
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub date: CellValue,
    pub position: CellValue,
    pub info: CellValue,
    pub deck: CellValue,
    pub decklist: CellValue,
    pub store: CellValue,
}

/// Display variants of a canonical date
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateDisplay {
    /// dd/mm/yyyy
    pub date_display: String,
    /// mm/yyyy
    pub month_year: String,
    pub month_name: String,
    pub weekday_name: String,
}

/// A record after per-field normalization, before the completeness filter.
/// Every `None` is a missing-value sentinel.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRecord {
    pub date: Option<NaiveDate>,
    pub position: Option<f64>,
    pub info: Option<String>,
    pub deck: Option<String>,
    pub decklist: Option<String>,
    pub store: Option<String>,
    pub store_id: Option<String>,
    pub deck_id: Option<String>,
    pub tournament_id: Option<String>,
    pub display: Option<DateDisplay>,
}

/// A record that survived cleaning: date, position, deck and store are present
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CleanRecord {
    pub date: NaiveDate,
    pub position: f64,
    pub info: Option<String>,
    pub deck: String,
    pub decklist: Option<String>,
    pub store: String,
    pub store_id: String,
    pub deck_id: Option<String>,
    pub tournament_id: String,
    pub display: DateDisplay,
}

impl NormalizedRecord {
    /// Promote to a `CleanRecord` when every required field is present.
    pub fn into_clean(self) -> Option<CleanRecord> {
        let date = self.date?;
        let position = self.position?;
        let deck = self.deck?;
        let store = self.store?;
        let store_id = self.store_id?;
        let tournament_id = self.tournament_id?;
        let display = self.display?;

        Some(CleanRecord {
            date,
            position,
            info: self.info,
            deck,
            decklist: self.decklist,
            store,
            store_id,
            deck_id: self.deck_id,
            tournament_id,
            display,
        })
    }
}

/// `tournaments_fact` row: one placement of one deck in one tournament
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactRow {
    pub tournament_id: String,
    pub date: NaiveDate,
    pub store_id: String,
    pub deck_id: Option<String>,
    pub position: f64,
    pub info: Option<String>,
}

/// `decks_dim` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeckRow {
    pub deck_id: String,
    pub deck: String,
    pub decklist: String,
}

/// `stores_dim` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreRow {
    pub store_id: String,
    pub store: String,
}

/// `dates_dim` row
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateRow {
    pub date: NaiveDate,
    pub date_display: String,
    pub month_year: String,
    pub month_name: String,
    pub weekday_name: String,
}
