//! SQLite store writer
//!
//! Every run drops and recreates the four tables, then builds lookup indexes.
//! Each table is filled inside its own transaction, but there is no
//! transaction spanning all four: a failure halfway leaves the earlier tables
//! rebuilt and the later ones stale or missing.

use crate::dimensional::{StarSchema, DATES_TABLE, DECKS_TABLE, FACT_TABLE, STORES_TABLE};
use crate::error::{EtlError, Result};
use crate::reporter::Reporter;
use serde::Serialize;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;

const FACT_COLUMNS: &str = "tournament_id TEXT NOT NULL, date TEXT NOT NULL, \
     store_id TEXT NOT NULL, deck_id TEXT, position REAL NOT NULL, info TEXT";
const DECKS_COLUMNS: &str = "deck_id TEXT NOT NULL, deck TEXT NOT NULL, decklist TEXT NOT NULL";
const STORES_COLUMNS: &str = "store_id TEXT NOT NULL, store TEXT NOT NULL";
const DATES_COLUMNS: &str = "date TEXT NOT NULL, date_display TEXT NOT NULL, \
     month_year TEXT NOT NULL, month_name TEXT NOT NULL, weekday_name TEXT NOT NULL";

/// (index name, table, column)
pub const INDEXES: &[(&str, &str, &str)] = &[
    ("idx_tournaments_tournament_id", FACT_TABLE, "tournament_id"),
    ("idx_tournaments_deck_id", FACT_TABLE, "deck_id"),
    ("idx_tournaments_store_id", FACT_TABLE, "store_id"),
    ("idx_tournaments_date", FACT_TABLE, "date"),
    ("idx_decks_deck_id", DECKS_TABLE, "deck_id"),
    ("idx_stores_store_id", STORES_TABLE, "store_id"),
];

/// Row count and column names of a persisted table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableSummary {
    pub name: String,
    pub rows: i64,
    pub columns: Vec<String>,
}

/// Open (or create) the store with a single connection.
/// Rollback journal: read-only readers must not need a `-shm` file.
pub async fn connect(path: &Path) -> Result<SqlitePool> {
    let options = SqliteConnectOptions::new()
        .filename(path)
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Delete);

    SqlitePoolOptions::new()
        .max_connections(1)
        .connect_with(options)
        .await
        .map_err(|e| EtlError::storage(path.display().to_string(), e))
}

async fn execute(pool: &SqlitePool, target: &str, sql: &str) -> Result<()> {
    sqlx::query(sql)
        .execute(pool)
        .await
        .map_err(|e| EtlError::storage(target, e))?;
    Ok(())
}

async fn recreate_table(pool: &SqlitePool, name: &str, columns: &str) -> Result<()> {
    execute(pool, name, &format!("DROP TABLE IF EXISTS {}", name)).await?;
    execute(pool, name, &format!("CREATE TABLE {} ({})", name, columns)).await
}

async fn count_rows(pool: &SqlitePool, name: &str) -> Result<i64> {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", name))
        .fetch_one(pool)
        .await
        .map_err(|e| EtlError::storage(name, e))
}

async fn write_facts(pool: &SqlitePool, schema: &StarSchema) -> Result<()> {
    let storage = |e: sqlx::Error| EtlError::storage(FACT_TABLE, e);
    recreate_table(pool, FACT_TABLE, FACT_COLUMNS).await?;

    let mut tx = pool.begin().await.map_err(storage)?;
    for fact in &schema.facts {
        sqlx::query(
            "INSERT INTO tournaments_fact (tournament_id, date, store_id, deck_id, position, info) \
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(&fact.tournament_id)
        .bind(fact.date)
        .bind(&fact.store_id)
        .bind(&fact.deck_id)
        .bind(fact.position)
        .bind(&fact.info)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
    }
    tx.commit().await.map_err(storage)
}

async fn write_decks(pool: &SqlitePool, schema: &StarSchema) -> Result<()> {
    let storage = |e: sqlx::Error| EtlError::storage(DECKS_TABLE, e);
    recreate_table(pool, DECKS_TABLE, DECKS_COLUMNS).await?;

    let mut tx = pool.begin().await.map_err(storage)?;
    for deck in &schema.decks {
        sqlx::query("INSERT INTO decks_dim (deck_id, deck, decklist) VALUES (?, ?, ?)")
            .bind(&deck.deck_id)
            .bind(&deck.deck)
            .bind(&deck.decklist)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
    }
    tx.commit().await.map_err(storage)
}

async fn write_stores(pool: &SqlitePool, schema: &StarSchema) -> Result<()> {
    let storage = |e: sqlx::Error| EtlError::storage(STORES_TABLE, e);
    recreate_table(pool, STORES_TABLE, STORES_COLUMNS).await?;

    let mut tx = pool.begin().await.map_err(storage)?;
    for store in &schema.stores {
        sqlx::query("INSERT INTO stores_dim (store_id, store) VALUES (?, ?)")
            .bind(&store.store_id)
            .bind(&store.store)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
    }
    tx.commit().await.map_err(storage)
}

async fn write_dates(pool: &SqlitePool, schema: &StarSchema) -> Result<()> {
    let storage = |e: sqlx::Error| EtlError::storage(DATES_TABLE, e);
    recreate_table(pool, DATES_TABLE, DATES_COLUMNS).await?;

    let mut tx = pool.begin().await.map_err(storage)?;
    for date in &schema.dates {
        sqlx::query(
            "INSERT INTO dates_dim (date, date_display, month_year, month_name, weekday_name) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(date.date)
        .bind(&date.date_display)
        .bind(&date.month_year)
        .bind(&date.month_name)
        .bind(&date.weekday_name)
        .execute(&mut *tx)
        .await
        .map_err(storage)?;
    }
    tx.commit().await.map_err(storage)
}

async fn log_created(pool: &SqlitePool, name: &str, reporter: &dyn Reporter) -> Result<()> {
    let count = count_rows(pool, name).await?;
    reporter.info(&format!("Table {} created with {} rows", name, count));
    Ok(())
}

/// Replace all four tables with the schema's rows, then index the join and
/// filter keys. Any failure is returned as-is; nothing is rolled back.
pub async fn write_star_schema(
    pool: &SqlitePool,
    schema: &StarSchema,
    reporter: &dyn Reporter,
) -> Result<()> {
    reporter.info(&format!("Creating table: {}", FACT_TABLE));
    write_facts(pool, schema).await?;
    log_created(pool, FACT_TABLE, reporter).await?;

    reporter.info(&format!("Creating table: {}", DECKS_TABLE));
    write_decks(pool, schema).await?;
    log_created(pool, DECKS_TABLE, reporter).await?;

    reporter.info(&format!("Creating table: {}", STORES_TABLE));
    write_stores(pool, schema).await?;
    log_created(pool, STORES_TABLE, reporter).await?;

    reporter.info(&format!("Creating table: {}", DATES_TABLE));
    write_dates(pool, schema).await?;
    log_created(pool, DATES_TABLE, reporter).await?;

    reporter.info("Creating indexes...");
    for (index, table, column) in INDEXES {
        execute(
            pool,
            index,
            &format!("CREATE INDEX IF NOT EXISTS {} ON {}({})", index, table, column),
        )
        .await?;
    }

    reporter.info("Data saved to store");
    Ok(())
}

/// Read back row counts and column names for every table
pub async fn table_summaries(pool: &SqlitePool) -> Result<Vec<TableSummary>> {
    let mut summaries = Vec::with_capacity(4);
    for name in [FACT_TABLE, DECKS_TABLE, STORES_TABLE, DATES_TABLE] {
        let rows = count_rows(pool, name).await?;
        let columns: Vec<String> =
            sqlx::query_scalar("SELECT name FROM pragma_table_info(?) ORDER BY cid")
                .bind(name)
                .fetch_all(pool)
                .await
                .map_err(|e| EtlError::storage(name, e))?;
        summaries.push(TableSummary {
            name: name.to_string(),
            rows,
            columns,
        });
    }
    Ok(summaries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MemoryReporter;
    use crate::testing::sample_schema;

    async fn written_store(dir: &tempfile::TempDir) -> SqlitePool {
        let pool = connect(&dir.path().join("store.sqlite")).await.unwrap();
        write_star_schema(&pool, &sample_schema(), &MemoryReporter::new())
            .await
            .unwrap();
        pool
    }

    // -------------------------------------------------------------------------
    // ROUND TRIP
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_round_trip_counts_and_columns() {
        let dir = tempfile::tempdir().unwrap();
        let pool = written_store(&dir).await;
        let schema = sample_schema();

        let summaries = table_summaries(&pool).await.unwrap();
        let counts: Vec<(String, i64)> = summaries
            .iter()
            .map(|s| (s.name.clone(), s.rows))
            .collect();
        let expected: Vec<(String, i64)> = schema
            .row_counts()
            .iter()
            .map(|(name, rows)| (name.to_string(), *rows as i64))
            .collect();
        assert_eq!(counts, expected);

        assert_eq!(
            summaries[0].columns,
            vec!["tournament_id", "date", "store_id", "deck_id", "position", "info"]
        );
        assert_eq!(summaries[1].columns, vec!["deck_id", "deck", "decklist"]);
        assert_eq!(summaries[2].columns, vec!["store_id", "store"]);
        assert_eq!(
            summaries[3].columns,
            vec!["date", "date_display", "month_year", "month_name", "weekday_name"]
        );
    }

    #[tokio::test]
    async fn test_values_persist() {
        let dir = tempfile::tempdir().unwrap();
        let pool = written_store(&dir).await;

        let (date, position): (String, f64) = sqlx::query_as(
            "SELECT date, position FROM tournaments_fact ORDER BY position DESC LIMIT 1",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(date, "2023-01-01");
        assert_eq!(position, 3.0);

        let missing_decks: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM tournaments_fact WHERE deck_id IS NULL")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(missing_decks, 1);

        let month: String = sqlx::query_scalar("SELECT month_name FROM dates_dim LIMIT 1")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(month, "Janeiro");
    }

    // -------------------------------------------------------------------------
    // FULL REPLACE
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_rewrite_replaces_instead_of_appending() {
        let dir = tempfile::tempdir().unwrap();
        let pool = written_store(&dir).await;
        write_star_schema(&pool, &sample_schema(), &MemoryReporter::new())
            .await
            .unwrap();

        let first = table_summaries(&pool).await.unwrap();
        assert_eq!(first[0].rows, 5);
        assert_eq!(first[1].rows, 2);
    }

    #[tokio::test]
    async fn test_stale_table_shape_is_replaced() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(&dir.path().join("store.sqlite")).await.unwrap();
        sqlx::query("CREATE TABLE stores_dim (legacy TEXT)")
            .execute(&pool)
            .await
            .unwrap();

        write_star_schema(&pool, &sample_schema(), &MemoryReporter::new())
            .await
            .unwrap();
        let summaries = table_summaries(&pool).await.unwrap();
        assert_eq!(summaries[2].columns, vec!["store_id", "store"]);
    }

    // -------------------------------------------------------------------------
    // INDEXES
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_indexes_created() {
        let dir = tempfile::tempdir().unwrap();
        let pool = written_store(&dir).await;

        let names: Vec<String> = sqlx::query_scalar(
            "SELECT name FROM sqlite_master WHERE type = 'index' AND name LIKE 'idx_%' ORDER BY name",
        )
        .fetch_all(&pool)
        .await
        .unwrap();

        let mut expected: Vec<String> = INDEXES.iter().map(|(n, _, _)| n.to_string()).collect();
        expected.sort();
        assert_eq!(names, expected);
    }

    // -------------------------------------------------------------------------
    // FAILURES
    // -------------------------------------------------------------------------

    #[tokio::test]
    async fn test_connect_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("store.sqlite");
        let err = connect(&path).await.unwrap_err();
        assert!(matches!(err, EtlError::Storage { .. }));
        assert!(err.to_string().contains("store.sqlite"));
    }

    #[tokio::test]
    async fn test_create_failure_names_table() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(&dir.path().join("store.sqlite")).await.unwrap();
        // DROP TABLE refuses to drop a view
        sqlx::query("CREATE VIEW decks_dim AS SELECT 1 AS deck_id")
            .execute(&pool)
            .await
            .unwrap();

        let err = write_star_schema(&pool, &sample_schema(), &MemoryReporter::new())
            .await
            .unwrap_err();
        match &err {
            EtlError::Storage { target, .. } => assert_eq!(target, DECKS_TABLE),
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(err.to_string().contains("decks_dim"));

        // tables written before the failure stay rebuilt
        assert_eq!(count_rows(&pool, FACT_TABLE).await.unwrap(), 5);
        let stores: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'stores_dim'",
        )
        .fetch_one(&pool)
        .await
        .unwrap();
        assert_eq!(stores, 0);
    }

    #[tokio::test]
    async fn test_write_logs_each_table() {
        let dir = tempfile::tempdir().unwrap();
        let pool = connect(&dir.path().join("store.sqlite")).await.unwrap();
        let reporter = MemoryReporter::new();
        write_star_schema(&pool, &sample_schema(), &reporter)
            .await
            .unwrap();

        let infos = reporter.infos();
        assert!(infos.contains(&"Table tournaments_fact created with 5 rows".to_string()));
        assert!(infos.contains(&"Table dates_dim created with 2 rows".to_string()));
    }
}
