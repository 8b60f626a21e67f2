//! ETL Service - Loads tournament results into the analytical store
//!
//! Responsibilities:
//! - Read the results workbook (first sheet) or a CSV export
//! - Validate the input shape
//! - Clean records: dates, identifiers, positions, missing values
//! - Project the star schema (tournaments_fact + decks/stores/dates dims)
//! - Replace the SQLite store tables and build indexes
//! - Export the same tables to a workbook for inspection
//!
//! CRITICAL: This service must be DETERMINISTIC
//! Same input file = same tables, every run
//!
//! Usage:
//!   cargo run --bin etl
//!   cargo run --bin etl -- --input data/raw/results.csv --skip-excel
//!   cargo run --bin etl -- --dry-run

mod clean;
mod dates;
mod dimensional;
mod error;
mod export;
mod ids;
mod records;
mod reporter;
mod source;
mod store;
#[cfg(test)]
mod testing;

use anyhow::{Context, Result};
use clap::Parser;
use clean::CleanReport;
use dates::DisplayLocale;
use error::EtlError;
use reporter::{Reporter, TracingReporter};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use store::TableSummary;

#[derive(Parser, Debug)]
#[command(name = "etl", about = "Loads tournament results into the analytical store")]
struct Args {
    /// Input workbook (xlsx/xls/ods) or CSV file
    #[arg(long)]
    input: Option<PathBuf>,

    /// SQLite store to (re)build
    #[arg(long)]
    db: Option<PathBuf>,

    /// Workbook export path
    #[arg(long)]
    excel: Option<PathBuf>,

    /// Log file (appended)
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Skip the workbook export
    #[arg(long, default_value = "false")]
    skip_excel: bool,

    /// Dry run - clean and build tables, write nothing
    #[arg(long, default_value = "false")]
    dry_run: bool,
}

#[derive(Debug, Clone)]
struct Config {
    input: PathBuf,
    db_path: PathBuf,
    excel_path: Option<PathBuf>,
    log_file: PathBuf,
    locale: DisplayLocale,
    dry_run: bool,
}

fn env_path(key: &str, default: &str) -> PathBuf {
    PathBuf::from(std::env::var(key).unwrap_or_else(|_| default.to_string()))
}

impl Config {
    /// Environment first, command-line flags override
    fn from_env(args: Args) -> Result<Self> {
        let locale_tag = std::env::var("ETL_LOCALE").unwrap_or_else(|_| "pt-BR".to_string());
        let locale = DisplayLocale::from_tag(&locale_tag)
            .with_context(|| format!("Unsupported ETL_LOCALE '{}' (expected pt-BR or en)", locale_tag))?;

        let excel_path = args
            .excel
            .unwrap_or_else(|| env_path("ETL_EXCEL_PATH", "data/refined/tournaments.xlsx"));

        Ok(Self {
            input: args
                .input
                .unwrap_or_else(|| env_path("ETL_INPUT", "data/raw/tournaments.xlsx")),
            db_path: args
                .db
                .unwrap_or_else(|| env_path("ETL_DB_PATH", "data/refined/tournaments.sqlite")),
            excel_path: (!args.skip_excel).then_some(excel_path),
            log_file: args
                .log_file
                .unwrap_or_else(|| env_path("ETL_LOG_FILE", "etl.log")),
            locale,
            dry_run: args.dry_run,
        })
    }
}

/// What a run produced
#[derive(Debug, Serialize)]
struct RunSummary {
    cleaning: CleanReport,
    tables: Vec<TableSummary>,
}

/// Create the input and output directories if they are missing
fn setup_directories(config: &Config, reporter: &dyn Reporter) -> std::result::Result<(), EtlError> {
    let dirs = [
        config.input.parent(),
        config.db_path.parent(),
        config.excel_path.as_deref().and_then(Path::parent),
    ];
    for dir in dirs.into_iter().flatten().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir).map_err(|e| EtlError::io(dir, e))?;
    }
    reporter.info("Directories ready");
    Ok(())
}

async fn run(config: &Config, reporter: &dyn Reporter) -> std::result::Result<RunSummary, EtlError> {
    setup_directories(config, reporter)?;

    reporter.info(&format!("Reading input file: {}", config.input.display()));
    let table = source::read_table(&config.input, reporter)?;

    let raw = clean::validate_raw(&table)?;
    reporter.info("Raw data validation passed");

    let (records, cleaning) = clean::clean_records(&raw, &config.locale, reporter);
    let schema = dimensional::build_star_schema(&records, reporter);

    if config.dry_run {
        let tables = schema
            .row_counts()
            .iter()
            .map(|(name, rows)| TableSummary {
                name: name.to_string(),
                rows: *rows as i64,
                columns: Vec::new(),
            })
            .collect();
        for (i, record) in records.iter().take(3).enumerate() {
            println!(
                "  [{}] {} | {} | {} | position {}",
                i + 1,
                record.tournament_id,
                record.store,
                record.deck,
                record.position
            );
        }
        if records.len() > 3 {
            println!("  ... and {} more", records.len() - 3);
        }
        reporter.info("Dry run - nothing written");
        return Ok(RunSummary { cleaning, tables });
    }

    reporter.info(&format!("Connecting to store: {}", config.db_path.display()));
    let pool = store::connect(&config.db_path).await?;
    store::write_star_schema(&pool, &schema, reporter).await?;

    if let Some(excel_path) = &config.excel_path {
        export::export_workbook(&schema, excel_path, reporter)?;
    }

    let tables = store::table_summaries(&pool).await?;
    for table in &tables {
        reporter.info(&format!("Validation: {} contains {} rows", table.name, table.rows));
    }
    pool.close().await;

    Ok(RunSummary { cleaning, tables })
}

fn try_main() -> Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env(Args::parse())?;

    reporter::init_tracing("info", Some(&config.log_file))?;
    let reporter = TracingReporter;
    reporter.info("Starting ETL process");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to build runtime")?;

    let summary = runtime.block_on(run(&config, &reporter))?;

    if config.dry_run {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    }
    reporter.info(&format!(
        "ETL process completed: {} records kept, {} dropped",
        summary.cleaning.kept_rows, summary.cleaning.dropped_rows
    ));
    Ok(())
}

fn main() -> ExitCode {
    match try_main() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("Error during ETL process: {:#}", e);
            eprintln!("Error during ETL process: {:#}", e);
            e.downcast_ref::<EtlError>()
                .map(EtlError::exit_code)
                .unwrap_or(ExitCode::FAILURE)
        }
    }
}

// =============================================================================
// TESTS - End-to-end runs over CSV input
// =============================================================================
