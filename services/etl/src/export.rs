//! Workbook export: the four tables as named sheets, for manual inspection

use crate::dimensional::{StarSchema, DATES_TABLE, DECKS_TABLE, FACT_TABLE, STORES_TABLE};
use crate::error::{EtlError, Result};
use crate::reporter::Reporter;
use rust_xlsxwriter::{Workbook, XlsxError};
use std::path::Path;

enum Cell<'a> {
    Text(&'a str),
    Number(f64),
    Blank,
}

impl<'a> From<&'a Option<String>> for Cell<'a> {
    fn from(value: &'a Option<String>) -> Self {
        value.as_deref().map(Cell::Text).unwrap_or(Cell::Blank)
    }
}

fn write_sheet<'a>(
    workbook: &mut Workbook,
    name: &str,
    headers: &[&str],
    rows: impl Iterator<Item = Vec<Cell<'a>>>,
) -> std::result::Result<usize, XlsxError> {
    let sheet = workbook.add_worksheet();
    sheet.set_name(name)?;

    for (col, header) in headers.iter().enumerate() {
        sheet.write_string(0, col as u16, *header)?;
    }

    let mut count = 0;
    for (idx, row) in rows.enumerate() {
        let row_num = idx as u32 + 1;
        for (col, cell) in row.into_iter().enumerate() {
            match cell {
                Cell::Text(text) => {
                    sheet.write_string(row_num, col as u16, text)?;
                }
                Cell::Number(n) => {
                    sheet.write_number(row_num, col as u16, n)?;
                }
                Cell::Blank => {}
            }
        }
        count += 1;
    }
    Ok(count)
}

fn build_workbook(
    schema: &StarSchema,
    reporter: &dyn Reporter,
) -> std::result::Result<Workbook, XlsxError> {
    let mut workbook = Workbook::new();

    let dates: Vec<String> = schema
        .facts
        .iter()
        .map(|f| f.date.format("%Y-%m-%d").to_string())
        .collect();
    let count = write_sheet(
        &mut workbook,
        FACT_TABLE,
        &["tournament_id", "date", "store_id", "deck_id", "position", "info"],
        schema.facts.iter().zip(&dates).map(|(f, date)| {
            vec![
                Cell::Text(&f.tournament_id),
                Cell::Text(date),
                Cell::Text(&f.store_id),
                Cell::from(&f.deck_id),
                Cell::Number(f.position),
                Cell::from(&f.info),
            ]
        }),
    )?;
    reporter.info(&format!("Sheet '{}' created with {} rows", FACT_TABLE, count));

    let count = write_sheet(
        &mut workbook,
        DECKS_TABLE,
        &["deck_id", "deck", "decklist"],
        schema.decks.iter().map(|d| {
            vec![
                Cell::Text(&d.deck_id),
                Cell::Text(&d.deck),
                Cell::Text(&d.decklist),
            ]
        }),
    )?;
    reporter.info(&format!("Sheet '{}' created with {} rows", DECKS_TABLE, count));

    let count = write_sheet(
        &mut workbook,
        STORES_TABLE,
        &["store_id", "store"],
        schema
            .stores
            .iter()
            .map(|s| vec![Cell::Text(&s.store_id), Cell::Text(&s.store)]),
    )?;
    reporter.info(&format!("Sheet '{}' created with {} rows", STORES_TABLE, count));

    let day_keys: Vec<String> = schema
        .dates
        .iter()
        .map(|d| d.date.format("%Y-%m-%d").to_string())
        .collect();
    let count = write_sheet(
        &mut workbook,
        DATES_TABLE,
        &["date", "date_display", "month_year", "month_name", "weekday_name"],
        schema.dates.iter().zip(&day_keys).map(|(d, key)| {
            vec![
                Cell::Text(key),
                Cell::Text(&d.date_display),
                Cell::Text(&d.month_year),
                Cell::Text(&d.month_name),
                Cell::Text(&d.weekday_name),
            ]
        }),
    )?;
    reporter.info(&format!("Sheet '{}' created with {} rows", DATES_TABLE, count));

    Ok(workbook)
}

/// Write every table of the schema to one xlsx workbook at `path`
pub fn export_workbook(schema: &StarSchema, path: &Path, reporter: &dyn Reporter) -> Result<()> {
    reporter.info(&format!("Exporting tables to workbook: {}", path.display()));

    let export_error = |source| EtlError::Export {
        path: path.to_path_buf(),
        source,
    };
    let mut workbook = build_workbook(schema, reporter).map_err(export_error)?;
    workbook.save(path).map_err(export_error)?;

    reporter.info("Workbook export complete");
    Ok(())
}
