//! Deck performance report over the star schema
//!
//! One row per deck name, restricted to decks seen at least twice.
//! Classification compares each deck against the average appearance count of
//! the qualifying decks and a fixed 50% top-4 rate.
//!
//! Names are grouped case-insensitively (`GROUP BY LOWER(deck)`) and reported
//! lower-cased: "Krenko" and "krenko" are one deck. Grouping on the raw name
//! instead would give two rows with the same displayed name.

use chrono::NaiveDate;
use serde::Serialize;
use sqlx::SqlitePool;
use thiserror::Error;

/// Top-4 rate (percent) separating high and low performers
pub const RATE_THRESHOLD: f64 = 50.0;

/// Decks with fewer appearances are left out of the report
pub const MIN_APPEARANCES: i64 = 2;

#[derive(Error, Debug)]
pub enum PerformanceError {
    #[error("no deck has at least two appearances")]
    Empty,

    #[error("performance query failed: {0}")]
    Query(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Category {
    #[serde(rename = "TOPPERS")]
    Toppers,
    #[serde(rename = "HIDDEN GEMS")]
    HiddenGems,
    #[serde(rename = "FAN FAVORITES")]
    FanFavorites,
    #[serde(rename = "CRINGES")]
    Cringes,
}

impl Category {
    /// Plot order, best tier first
    pub const ALL: [Category; 4] = [
        Category::Toppers,
        Category::HiddenGems,
        Category::FanFavorites,
        Category::Cringes,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Category::Toppers => "TOPPERS",
            Category::HiddenGems => "HIDDEN GEMS",
            Category::FanFavorites => "FAN FAVORITES",
            Category::Cringes => "CRINGES",
        }
    }

    pub fn description(self) -> &'static str {
        match self {
            Category::Toppers => "High top-4 rate (>= 50%) and many appearances (at or above average).",
            Category::HiddenGems => "High top-4 rate (>= 50%), but less popular.",
            Category::FanFavorites => "Popular (at or above average appearances), but top-4 rate below 50%.",
            Category::Cringes => "Less popular and low top-4 rate.",
        }
    }

    /// Both comparisons are inclusive
    pub fn classify(appearances: i64, top4_rate: f64, popularity_threshold: f64) -> Self {
        let performs = top4_rate >= RATE_THRESHOLD;
        let popular = appearances as f64 >= popularity_threshold;
        match (performs, popular) {
            (true, true) => Category::Toppers,
            (true, false) => Category::HiddenGems,
            (false, true) => Category::FanFavorites,
            (false, false) => Category::Cringes,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct DeckStatsRow {
    deck: String,
    total_appearances: i64,
    top4_count: i64,
    top4_rate: f64,
    first_appearance: NaiveDate,
    last_appearance: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeckPerformance {
    pub deck: String,
    pub total_appearances: i64,
    pub top4_count: i64,
    pub top4_rate: f64,
    pub first_appearance: NaiveDate,
    pub last_appearance: NaiveDate,
    pub category: Category,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PerformanceReport {
    /// Mean appearances across the reported decks
    pub popularity_threshold: f64,
    pub rate_threshold: f64,
    pub decks: Vec<DeckPerformance>,
}

const DECK_STATS_SQL: &str = r#"
    SELECT
        LOWER(d.deck) AS deck,
        COUNT(*) AS total_appearances,
        SUM(CASE WHEN f.position <= 4 THEN 1 ELSE 0 END) AS top4_count,
        ROUND(100.0 * SUM(CASE WHEN f.position <= 4 THEN 1 ELSE 0 END) / COUNT(*), 2) AS top4_rate,
        MIN(f.date) AS first_appearance,
        MAX(f.date) AS last_appearance
    FROM tournaments_fact f
    JOIN decks_dim d ON f.deck_id = d.deck_id
    GROUP BY LOWER(d.deck)
    HAVING COUNT(*) >= ?
    ORDER BY total_appearances DESC, top4_rate DESC, deck ASC
"#;

/// Classify already-aggregated rows; `None` when there is nothing to report
fn classify_rows(rows: Vec<DeckStatsRow>) -> Option<PerformanceReport> {
    if rows.is_empty() {
        return None;
    }

    let total: i64 = rows.iter().map(|r| r.total_appearances).sum();
    let popularity_threshold = total as f64 / rows.len() as f64;

    let decks = rows
        .into_iter()
        .map(|r| DeckPerformance {
            category: Category::classify(r.total_appearances, r.top4_rate, popularity_threshold),
            deck: r.deck,
            total_appearances: r.total_appearances,
            top4_count: r.top4_count,
            top4_rate: r.top4_rate,
            first_appearance: r.first_appearance,
            last_appearance: r.last_appearance,
        })
        .collect();

    Some(PerformanceReport {
        popularity_threshold,
        rate_threshold: RATE_THRESHOLD,
        decks,
    })
}

pub async fn deck_performance(pool: &SqlitePool) -> Result<PerformanceReport, PerformanceError> {
    tracing::info!("Querying deck performance");

    let rows: Vec<DeckStatsRow> = sqlx::query_as(DECK_STATS_SQL)
        .bind(MIN_APPEARANCES)
        .fetch_all(pool)
        .await?;

    let report = classify_rows(rows).ok_or(PerformanceError::Empty)?;
    tracing::info!(
        decks = report.decks.len(),
        popularity_threshold = report.popularity_threshold,
        "Deck performance ready"
    );
    Ok(report)
}
