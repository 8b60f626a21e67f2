//! Input readers: spreadsheet workbooks (calamine) and CSV exports
//!
//! Both produce a `RawTable`: the header row as text plus typed data cells.
//! Column mapping and validation happen in the cleaner, not here.

use crate::dates::from_spreadsheet_serial;
use crate::error::{EtlError, Result};
use crate::records::{CellValue, RawTable};
use crate::reporter::Reporter;
use calamine::{open_workbook_auto, Data, Reader};
use std::path::Path;

/// Detect CSV input by extension; everything else goes through calamine,
/// which auto-detects xls, xlsx, xlsb and ods.
pub fn is_csv_file(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

/// Read the input file into a raw table
pub fn read_table(path: &Path, reporter: &dyn Reporter) -> Result<RawTable> {
    if !path.exists() {
        return Err(EtlError::source_error(path, "file not found"));
    }

    let table = if is_csv_file(path) {
        let bytes = std::fs::read(path).map_err(|e| EtlError::source_error(path, e))?;
        parse_csv_bytes(&bytes).map_err(|e| EtlError::source_error(path, e))?
    } else {
        read_workbook(path, reporter)?
    };

    reporter.info(&format!(
        "Loaded {} rows x {} columns from {}",
        table.rows.len(),
        table.headers.len(),
        path.display()
    ));
    Ok(table)
}

fn convert_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::Text(s.clone()),
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Text(b.to_string()),
        Data::DateTime(dt) => from_spreadsheet_serial(dt.as_f64())
            .map(CellValue::DateTime)
            .unwrap_or(CellValue::Number(dt.as_f64())),
        Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::Text(s.clone()),
        Data::Error(e) => CellValue::Text(e.to_string()),
    }
}

fn header_text(cell: &Data) -> String {
    match cell {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => format!("{}", other),
    }
}

fn is_blank_row(row: &[CellValue]) -> bool {
    row.iter().all(|cell| cell.as_text().is_none())
}

/// First worksheet of a workbook: header row, then data rows. Fully blank
/// rows are skipped.
fn read_workbook(path: &Path, reporter: &dyn Reporter) -> Result<RawTable> {
    let mut workbook =
        open_workbook_auto(path).map_err(|e| EtlError::source_error(path, e))?;

    let sheet_names = workbook.sheet_names().to_vec();
    let sheet_name = sheet_names
        .first()
        .ok_or_else(|| EtlError::source_error(path, "workbook has no sheets"))?
        .clone();

    if sheet_names.len() > 1 {
        reporter.info(&format!(
            "Reading sheet '{}' (first of {} sheets)",
            sheet_name,
            sheet_names.len()
        ));
    }

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| EtlError::source_error(path, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(header_row) => header_row.iter().map(header_text).collect(),
        None => return Ok(RawTable::default()),
    };

    let data: Vec<Vec<CellValue>> = rows
        .map(|row| row.iter().map(convert_cell).collect::<Vec<_>>())
        .filter(|row| !is_blank_row(row))
        .collect();

    Ok(RawTable {
        headers,
        rows: data,
    })
}

/// CSV text with a header line. UTF-8 (BOM stripped) or Windows-1252.
pub fn parse_csv_bytes(bytes: &[u8]) -> std::result::Result<RawTable, csv::Error> {
    let content = match std::str::from_utf8(bytes) {
        Ok(text) => std::borrow::Cow::Borrowed(text),
        Err(_) => encoding_rs::WINDOWS_1252.decode(bytes).0,
    };
    let content: &str = &content;
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row: Vec<CellValue> = record
            .iter()
            .map(|field| {
                if field.is_empty() {
                    CellValue::Empty
                } else {
                    CellValue::Text(field.to_string())
                }
            })
            .collect();
        if !is_blank_row(&row) {
            rows.push(row);
        }
    }

    Ok(RawTable { headers, rows })
}
