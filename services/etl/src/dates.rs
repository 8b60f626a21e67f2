//! Date normalization and display variants
//!
//! Tournament sheets mix ISO dates (`2023-01-15`, `2023-01-15 00:00:00`),
//! day-month-abbreviation dates (`15-Jan-2023`, `15-Jan-23`) and native spreadsheet date
//! cells. Everything collapses into a `NaiveDate`; anything unparseable becomes
//! `None` with a warning and is filtered out later.

use crate::records::{CellValue, DateDisplay};
use crate::reporter::Reporter;
use chrono::{Days, NaiveDate, NaiveDateTime, NaiveTime};

const ISO_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];
const DAY_FIRST_FORMATS: &[&str] = &["%d-%b-%Y", "%d %b %Y", "%d/%m/%Y"];
/// `%y` maps 00-68 to 2000-2068 and 69-99 to 1969-1999
const DAY_FIRST_SHORT_YEAR_FORMATS: &[&str] = &["%d-%b-%y", "%d %b %y", "%d/%m/%y"];

/// Last serial day representable in a spreadsheet (9999-12-31)
const MAX_SPREADSHEET_SERIAL: f64 = 2_958_465.0;

/// Month and weekday translation tables, keyed by English name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayLocale {
    pub tag: &'static str,
    pub months: &'static [(&'static str, &'static str)],
    pub weekdays: &'static [(&'static str, &'static str)],
}

pub const PT_BR: DisplayLocale = DisplayLocale {
    tag: "pt-BR",
    months: &[
        ("January", "Janeiro"),
        ("February", "Fevereiro"),
        ("March", "Março"),
        ("April", "Abril"),
        ("May", "Maio"),
        ("June", "Junho"),
        ("July", "Julho"),
        ("August", "Agosto"),
        ("September", "Setembro"),
        ("October", "Outubro"),
        ("November", "Novembro"),
        ("December", "Dezembro"),
    ],
    weekdays: &[
        ("Monday", "Segunda-feira"),
        ("Tuesday", "Terça-feira"),
        ("Wednesday", "Quarta-feira"),
        ("Thursday", "Quinta-feira"),
        ("Friday", "Sexta-feira"),
        ("Saturday", "Sábado"),
        ("Sunday", "Domingo"),
    ],
};

/// Untranslated: every lookup falls back to the English name
pub const EN: DisplayLocale = DisplayLocale {
    tag: "en",
    months: &[],
    weekdays: &[],
};

impl DisplayLocale {
    pub fn from_tag(tag: &str) -> Option<DisplayLocale> {
        [PT_BR, EN]
            .into_iter()
            .find(|locale| locale.tag.eq_ignore_ascii_case(tag.trim()))
    }

    fn translate(table: &[(&str, &'static str)], english: &str) -> String {
        table
            .iter()
            .find(|(source, _)| *source == english)
            .map(|(_, translated)| translated.to_string())
            .unwrap_or_else(|| english.to_string())
    }

    pub fn month_name(&self, english: &str) -> String {
        Self::translate(self.months, english)
    }

    pub fn weekday_name(&self, english: &str) -> String {
        Self::translate(self.weekdays, english)
    }
}

impl Default for DisplayLocale {
    fn default() -> Self {
        PT_BR
    }
}

fn has_iso_hyphen(text: &str) -> bool {
    let bytes = text.as_bytes();
    bytes.len() > 4 && bytes[..4].iter().all(u8::is_ascii_digit) && bytes[4] == b'-'
}

fn parse_iso(text: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok().or_else(|| {
        ISO_DATETIME_FORMATS
            .iter()
            .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
            .map(|dt| dt.date())
    })
}

/// Digits at the end of the text: the year field of a day-first date
fn trailing_year_digits(text: &str) -> usize {
    text.rsplit(|c: char| !c.is_ascii_digit())
        .next()
        .map(str::len)
        .unwrap_or(0)
}

/// `%Y` accepts a year of any width, so the year field picks the format set:
/// four digits as-is, two digits expanded to a full year, anything else fails.
fn parse_day_first(text: &str) -> Option<NaiveDate> {
    let formats = match trailing_year_digits(text) {
        4 => DAY_FIRST_FORMATS,
        2 => DAY_FIRST_SHORT_YEAR_FORMATS,
        _ => return None,
    };
    formats
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

/// Spreadsheet serial number (1900 date system, day 0 = 1899-12-30); the
/// fractional part is the time of day.
pub fn from_spreadsheet_serial(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || serial < 1.0 || serial > MAX_SPREADSHEET_SERIAL {
        return None;
    }
    let days = serial.floor();
    let seconds = (((serial - days) * 86_400.0).round() as u32).min(86_399);
    let date = NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_days(Days::new(days as u64))?;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)?;
    Some(date.and_time(time))
}

/// Parse a date cell. Returns `None` (the missing-date sentinel) when every
/// strategy fails; a warning names the offending value. Empty cells are
/// silently missing.
pub fn normalize_date(value: &CellValue, reporter: &dyn Reporter) -> Option<NaiveDate> {
    let parsed = match value {
        CellValue::Empty => return None,
        CellValue::DateTime(dt) => Some(dt.date()),
        CellValue::Number(serial) => from_spreadsheet_serial(*serial).map(|dt| dt.date()),
        CellValue::Text(raw) => {
            let text = raw.trim();
            if text.is_empty() {
                return None;
            }
            if has_iso_hyphen(text) {
                parse_iso(text)
            } else {
                parse_day_first(text)
            }
        }
    };

    if parsed.is_none() {
        reporter.warn(&format!("Could not convert date '{}'", value));
    }
    parsed
}

/// Display variants for a canonical date in the given locale
pub fn display(date: NaiveDate, locale: &DisplayLocale) -> DateDisplay {
    DateDisplay {
        date_display: date.format("%d/%m/%Y").to_string(),
        month_year: date.format("%m/%Y").to_string(),
        month_name: locale.month_name(&date.format("%B").to_string()),
        weekday_name: locale.weekday_name(&date.format("%A").to_string()),
    }
}
