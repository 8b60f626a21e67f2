//! Deterministic identifiers for stores, tournaments and decks
//!
//! Same input = same identifier, on every run and every machine. All hashes
//! are SHA-256 over the UTF-8 bytes, rendered as lower-case hex.

use chrono::NaiveDate;
use sha2::{Digest, Sha256};

const STORE_PREFIX_CHARS: usize = 3;
const STORE_HASH_CHARS: usize = 4;
const DECK_HASH_CHARS: usize = 8;

fn short_hash(input: &str, len: usize) -> String {
    let mut hasher = Sha256::new();
    hasher.update(input.as_bytes());
    let hex = format!("{:x}", hasher.finalize());
    hex[..len].to_string()
}

/// `<first 3 chars>_<4 hex chars>` of the trimmed, lower-cased store name.
///
/// A blank name still yields a stable identifier (`_<hash of "">`).
pub fn store_id(name: &str) -> String {
    let normalized = name.trim().to_lowercase();
    let prefix: String = normalized.chars().take(STORE_PREFIX_CHARS).collect();
    format!("{}_{}", prefix, short_hash(&normalized, STORE_HASH_CHARS))
}

/// `t_<YYYYMMDD>_<store_id>`: one tournament is one store on one day.
pub fn tournament_id(date: NaiveDate, store_id: &str) -> String {
    format!("t_{}_{}", date.format("%Y%m%d"), store_id)
}

/// `d_<8 hex chars>` of the decklist reference; no reference, no deck id.
pub fn deck_id(reference: Option<&str>) -> Option<String> {
    let reference = reference.map(str::trim).filter(|r| !r.is_empty())?;
    Some(format!("d_{}", short_hash(reference, DECK_HASH_CHARS)))
}
