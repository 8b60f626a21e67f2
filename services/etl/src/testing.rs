//! Shared fixtures for unit tests

use crate::dates::{display, PT_BR};
use crate::dimensional::{build_star_schema, StarSchema};
use crate::ids;
use crate::records::CleanRecord;
use crate::reporter::MemoryReporter;
use chrono::NaiveDate;

pub fn clean_record(
    date: (i32, u32, u32),
    store: &str,
    deck: &str,
    decklist: Option<&str>,
    position: f64,
) -> CleanRecord {
    let date = NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap();
    let store_id = ids::store_id(store);
    CleanRecord {
        date,
        position,
        info: None,
        deck: deck.to_string(),
        decklist: decklist.map(String::from),
        store: store.to_string(),
        tournament_id: ids::tournament_id(date, &store_id),
        store_id,
        deck_id: ids::deck_id(decklist),
        display: display(date, &PT_BR),
    }
}

/// Two tournaments, three decklists, one record without a decklist
pub fn sample_records() -> Vec<CleanRecord> {
    vec![
        clean_record((2023, 1, 1), "Game Haven", "Krenko", Some("http://x/krenko"), 1.0),
        clean_record((2023, 1, 1), "Game Haven", "Tymna", Some("http://x/tymna"), 2.0),
        clean_record((2023, 1, 1), "Game Haven", "Krenko", Some("http://x/krenko"), 3.0),
        clean_record((2023, 1, 8), "Mana Pool", "Krenko", Some("http://x/krenko"), 1.0),
        clean_record((2023, 1, 8), "Mana Pool", "Brewed", None, 2.0),
    ]
}

pub fn sample_schema() -> StarSchema {
    build_star_schema(&sample_records(), &MemoryReporter::new())
}
