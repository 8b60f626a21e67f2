//! Star schema projection: one fact table, three dimensions
//!
//! Dimensions keep the first-seen attributes for each key. When the source
//! spells the same store two ways (or reuses a decklist URL under a different
//! deck name) the earlier row wins; nothing reconciles the conflict.

use crate::records::{CleanRecord, DateRow, DeckRow, FactRow, StoreRow};
use crate::reporter::Reporter;
use serde::Serialize;
use std::collections::HashSet;
use std::hash::Hash;

pub const FACT_TABLE: &str = "tournaments_fact";
pub const DECKS_TABLE: &str = "decks_dim";
pub const STORES_TABLE: &str = "stores_dim";
pub const DATES_TABLE: &str = "dates_dim";

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StarSchema {
    pub facts: Vec<FactRow>,
    pub decks: Vec<DeckRow>,
    pub stores: Vec<StoreRow>,
    pub dates: Vec<DateRow>,
}

impl StarSchema {
    /// (table name, row count) in write order
    pub fn row_counts(&self) -> [(&'static str, usize); 4] {
        [
            (FACT_TABLE, self.facts.len()),
            (DECKS_TABLE, self.decks.len()),
            (STORES_TABLE, self.stores.len()),
            (DATES_TABLE, self.dates.len()),
        ]
    }
}

/// Keep the first row per key, in first-seen order
fn dedup_first<T, K, F>(rows: impl Iterator<Item = T>, key: F) -> Vec<T>
where
    K: Eq + Hash,
    F: Fn(&T) -> K,
{
    let mut seen = HashSet::new();
    rows.filter(|row| seen.insert(key(row))).collect()
}

pub fn build_star_schema(records: &[CleanRecord], reporter: &dyn Reporter) -> StarSchema {
    reporter.info("Building dimensional tables");

    let facts: Vec<FactRow> = records
        .iter()
        .map(|r| FactRow {
            tournament_id: r.tournament_id.clone(),
            date: r.date,
            store_id: r.store_id.clone(),
            deck_id: r.deck_id.clone(),
            position: r.position,
            info: r.info.clone(),
        })
        .collect();

    let decks = dedup_first(
        records.iter().filter_map(|r| {
            let deck_id = r.deck_id.clone()?;
            Some(DeckRow {
                deck_id,
                deck: r.deck.clone(),
                decklist: r.decklist.clone().unwrap_or_default(),
            })
        }),
        |row| row.deck_id.clone(),
    );

    let stores = dedup_first(
        records.iter().map(|r| StoreRow {
            store_id: r.store_id.clone(),
            store: r.store.clone(),
        }),
        |row| row.store_id.clone(),
    );

    let dates = dedup_first(
        records.iter().map(|r| DateRow {
            date: r.date,
            date_display: r.display.date_display.clone(),
            month_year: r.display.month_year.clone(),
            month_name: r.display.month_name.clone(),
            weekday_name: r.display.weekday_name.clone(),
        }),
        |row| row.date,
    );

    let schema = StarSchema {
        facts,
        decks,
        stores,
        dates,
    };

    let [facts, decks, stores, dates] = schema.row_counts();
    reporter.info(&format!(
        "Tables built: {} = {} rows, {} = {} unique, {} = {} unique, {} = {} unique",
        facts.0, facts.1, decks.0, decks.1, stores.0, stores.1, dates.0, dates.1
    ));

    schema
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reporter::MemoryReporter;
    use crate::testing::{clean_record as record, sample_records as sample};

    #[test]
    fn test_fact_table_keeps_every_record() {
        let reporter = MemoryReporter::new();
        let schema = build_star_schema(&sample(), &reporter);
        assert_eq!(schema.facts.len(), 5);
        assert_eq!(schema.facts[4].deck_id, None);
        assert_eq!(schema.facts[0].tournament_id, schema.facts[2].tournament_id);
    }

    #[test]
    fn test_decks_dedup_and_drop_missing_ids() {
        let reporter = MemoryReporter::new();
        let schema = build_star_schema(&sample(), &reporter);
        let names: Vec<&str> = schema.decks.iter().map(|d| d.deck.as_str()).collect();
        assert_eq!(names, vec!["Krenko", "Tymna"]);
        assert_eq!(schema.decks[0].decklist, "http://x/krenko");
    }

    #[test]
    fn test_stores_and_dates_dedup() {
        let reporter = MemoryReporter::new();
        let schema = build_star_schema(&sample(), &reporter);
        assert_eq!(schema.stores.len(), 2);
        assert_eq!(schema.stores[0].store, "Game Haven");
        assert_eq!(schema.dates.len(), 2);
        assert_eq!(schema.dates[1].date_display, "08/01/2023");
    }

    #[test]
    fn test_first_seen_attributes_win() {
        let reporter = MemoryReporter::new();
        let records = vec![
            record((2023, 1, 1), "Game Haven", "Krenko", Some("http://x/k"), 1.0),
            record((2023, 1, 2), "game haven", "Krenko, Tin Street", Some("http://x/k"), 1.0),
        ];
        let schema = build_star_schema(&records, &reporter);
        assert_eq!(schema.stores.len(), 1);
        assert_eq!(schema.stores[0].store, "Game Haven");
        assert_eq!(schema.decks.len(), 1);
        assert_eq!(schema.decks[0].deck, "Krenko");
    }

    #[test]
    fn test_build_is_idempotent() {
        let reporter = MemoryReporter::new();
        let first = build_star_schema(&sample(), &reporter);
        let second = build_star_schema(&sample(), &reporter);
        assert_eq!(first, second);
    }

    #[test]
    fn test_row_counts_logged() {
        let reporter = MemoryReporter::new();
        build_star_schema(&sample(), &reporter);
        let summary = reporter.infos().pop().unwrap();
        assert!(summary.contains("tournaments_fact = 5 rows"));
        assert!(summary.contains("decks_dim = 2 unique"));
    }
}
