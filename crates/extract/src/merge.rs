//! Merging of per-strategy entity maps into one canonical map.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::normalizer::normalize_entity;
use crate::schema::EntityMap;

const BANK_ABBREVIATIONS: &[(&str, &str)] = &[
    ("GS", "Goldman Sachs"),
    ("MS", "Morgan Stanley"),
    ("JPM", "JPMorgan"),
    ("BAC", "Bank of America"),
    ("C", "Citigroup"),
    ("DB", "Deutsche Bank"),
    ("UBS", "UBS Group"),
    ("CS", "Credit Suisse"),
    ("HSBC", "HSBC Holdings"),
    ("BNP", "BNP Paribas"),
];

/// Concatenate values per type in input order and drop case/whitespace
/// duplicates. The first occurrence wins and keeps its (trimmed) casing.
pub fn merge(maps: &[EntityMap]) -> EntityMap {
    merge_with(maps, |value| value.trim().to_string())
}

/// Like [`merge`], but every value is passed through [`normalize_entity`]
/// before comparison.
pub fn merge_normalized(maps: &[EntityMap]) -> EntityMap {
    merge_with(maps, normalize_entity)
}

fn merge_with(maps: &[EntityMap], prepare: impl Fn(&str) -> String) -> EntityMap {
    let mut merged: IndexMap<String, Vec<String>> = IndexMap::new();
    let mut seen: IndexMap<String, HashSet<String>> = IndexMap::new();

    for map in maps {
        for (entity_type, values) in map.iter() {
            for value in values {
                let prepared = prepare(value);
                if prepared.is_empty() {
                    continue;
                }
                let key = prepared.to_lowercase();
                if seen.entry(entity_type.to_string()).or_default().insert(key) {
                    merged
                        .entry(entity_type.to_string())
                        .or_default()
                        .push(prepared);
                }
            }
        }
    }

    merged.into_iter().filter(|(_, v)| !v.is_empty()).collect()
}

/// Validation and cleanup applied after merging free-text sources.
///
/// Drops values shorter than 2 characters, normalizes casing, expands bank
/// abbreviations for counterparties and filters malformed ISINs. The result
/// is re-deduplicated since expansion can turn two values into one.
pub fn post_process(entities: &EntityMap) -> EntityMap {
    let mut processed = EntityMap::new();

    for (entity_type, values) in entities.iter() {
        for value in values {
            if value.chars().count() < 2 {
                continue;
            }

            let mut normalized = normalize_entity(value);

            if entity_type == "counterparty" {
                normalized = expand_abbreviation(&normalized);
            }

            if entity_type == "isin" && !validate_isin(&normalized) {
                continue;
            }

            processed.push(entity_type, normalized);
        }
    }

    merge(&[processed])
}

/// Expand a well-known bank abbreviation, matched case-insensitively on the
/// whole value. Anything else is returned unchanged.
pub fn expand_abbreviation(value: &str) -> String {
    let upper = value.trim().to_uppercase();
    BANK_ABBREVIATIONS
        .iter()
        .find(|(abbr, _)| *abbr == upper)
        .map(|(_, full)| full.to_string())
        .unwrap_or_else(|| value.to_string())
}

/// 12 characters: 2 letters, 9 alphanumerics, 1 digit.
pub fn validate_isin(isin: &str) -> bool {
    let chars: Vec<char> = isin.chars().collect();
    chars.len() == 12
        && chars[..2].iter().all(char::is_ascii_alphabetic)
        && chars[2..11].iter().all(char::is_ascii_alphanumeric)
        && chars[11].is_ascii_digit()
}
