//! Rule-based extraction for structured documents (paragraphs + tables).

use ingest::{StructuredDocument, Table};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::merge::merge_normalized;
use crate::patterns::{self, DATE, ISIN, NUMERIC, PERCENTAGE};
use crate::schema::EntityMap;

static KEY_VALUE_SPLIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[:\-]").unwrap());

/// How a table value cell is narrowed once its key cell matched.
#[derive(Clone, Copy)]
enum CellValue {
    /// The cell as-is, when longer than 2 characters.
    Raw,
    Numeric,
    Isin,
    /// Date substrings, else the raw non-empty cell.
    DateOrRaw,
    Date,
    Percentage,
    /// Exactly three upper-case letters.
    CurrencyCode,
}

/// Key-cell keywords per entity type; the first matching row wins.
const TABLE_KEYS: &[(&str, &[&str], CellValue)] = &[
    ("counterparty", &["counterparty", "party", "issuer"], CellValue::Raw),
    ("notional", &["notional", "principal", "amount"], CellValue::Numeric),
    ("isin", &["isin"], CellValue::Isin),
    ("underlying", &["underlying", "reference", "asset"], CellValue::Raw),
    ("maturity", &["maturity", "expiry", "expiration"], CellValue::DateOrRaw),
    ("coupon", &["coupon", "rate", "interest"], CellValue::Percentage),
    ("barrier", &["barrier", "strike", "trigger"], CellValue::Numeric),
    ("trade_date", &["trade date", "execution date"], CellValue::Date),
    ("currency", &["currency"], CellValue::CurrencyCode),
];

/// Line-key keywords per entity type; the first matching row wins.
const LINE_KEYS: &[(&str, &[&str])] = &[
    ("counterparty", &["counterparty", "party", "issuer", "client"]),
    ("notional", &["notional", "principal", "nominal"]),
    ("underlying", &["underlying", "reference", "asset"]),
    ("maturity", &["maturity", "expiry", "expiration"]),
    ("coupon", &["coupon", "interest rate"]),
    ("barrier", &["barrier", "strike", "trigger"]),
    ("trade_date", &["trade date", "execution"]),
    ("payment_frequency", &["payment frequency", "frequency"]),
];

/// Pattern, table and key-value strategies merged into one map.
pub fn extract_structured(doc: &StructuredDocument) -> EntityMap {
    let lines = doc.paragraph_text();

    let pattern_entities = patterns::extract_all(&lines);
    let table_entities = extract_from_tables(&doc.tables);
    let kv_entities = extract_key_value_pairs(&lines);

    merge_normalized(&[pattern_entities, table_entities, kv_entities])
}

/// Walk every adjacent (key, value) cell pair of every row.
pub fn extract_from_tables(tables: &[Table]) -> EntityMap {
    let mut entities = EntityMap::new();

    for table in tables {
        for row in &table.rows {
            for pair in row.windows(2) {
                let key = pair[0].trim().to_lowercase();
                let value = pair[1].trim();

                let Some((entity_type, _, kind)) = TABLE_KEYS
                    .iter()
                    .find(|(_, terms, _)| terms.iter().any(|t| key.contains(t)))
                else {
                    continue;
                };

                entities.extend(entity_type, read_cell(value, *kind));
            }
        }
    }

    entities
}

fn read_cell(value: &str, kind: CellValue) -> Vec<String> {
    match kind {
        CellValue::Raw => {
            if value.chars().count() > 2 {
                vec![value.to_string()]
            } else {
                Vec::new()
            }
        }
        CellValue::Numeric => patterns::find_all(&NUMERIC, value),
        CellValue::Isin => patterns::find_all(&ISIN, value),
        CellValue::DateOrRaw => {
            let dates = patterns::find_all(&DATE, value);
            if dates.is_empty() && !value.is_empty() {
                vec![value.to_string()]
            } else {
                dates
            }
        }
        CellValue::Date => patterns::find_all(&DATE, value),
        CellValue::Percentage => patterns::find_all(&PERCENTAGE, value),
        CellValue::CurrencyCode => {
            if value.len() == 3 && value.chars().all(|c| c.is_ascii_uppercase()) {
                vec![value.to_string()]
            } else {
                Vec::new()
            }
        }
    }
}

/// Scan `Key: Value` / `Key - Value` lines and keep the raw right-hand side.
pub fn extract_key_value_pairs(text: &str) -> EntityMap {
    let mut entities = EntityMap::new();

    for line in text.lines() {
        let line = line.trim();
        let mut parts = KEY_VALUE_SPLIT.splitn(line, 2);
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };

        let key = key.trim().to_lowercase();
        if let Some((entity_type, _)) = LINE_KEYS
            .iter()
            .find(|(_, terms)| terms.iter().any(|t| key.contains(t)))
        {
            entities.push(entity_type, value.trim());
        }
    }

    entities
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(paragraphs: &[&str], rows: &[&[&str]]) -> StructuredDocument {
        StructuredDocument {
            paragraphs: paragraphs.iter().map(|p| p.to_string()).collect(),
            tables: if rows.is_empty() {
                Vec::new()
            } else {
                vec![Table {
                    rows: rows
                        .iter()
                        .map(|r| r.iter().map(|c| c.to_string()).collect())
                        .collect(),
                }]
            },
        }
    }

    #[test]
    fn test_term_sheet_lines() {
        let document = doc(
            &[
                "Counterparty: Goldman Sachs",
                "Notional: 200 mio",
                "ISIN: US0378331005",
                "Coupon: 5%",
            ],
            &[],
        );

        let entities = extract_structured(&document);

        assert_eq!(entities.get("counterparty").unwrap(), ["Goldman Sachs"]);
        let notional = entities.get("notional").unwrap();
        assert!(!notional.is_empty());
        assert!(notional.iter().all(|n| n == "200 mio" || n == "200"));
        assert_eq!(entities.get("isin").unwrap(), ["US0378331005"]);
        assert_eq!(entities.get("coupon").unwrap(), ["5%"]);
    }

    #[test]
    fn test_table_walker() {
        let tables = vec![Table {
            rows: vec![
                vec!["Issuer".into(), "Societe Generale".into()],
                vec!["Notional Amount".into(), "EUR 10,000,000".into()],
                vec!["ISIN Code".into(), "XS1234567890".into()],
                vec!["Maturity Date".into(), "15/06/2027".into()],
                vec!["Expiry".into(), "Five years".into()],
                vec!["Coupon Rate".into(), "4.5% p.a.".into()],
                vec!["Barrier Level".into(), "65.5".into()],
                vec!["Trade Date".into(), "01/02/2024".into()],
                vec!["Currency".into(), "EUR".into()],
                vec!["Currency".into(), "Euro".into()],
                vec!["Party".into(), "AB".into()],
            ],
        }];

        let entities = extract_from_tables(&tables);

        assert_eq!(entities.get("counterparty").unwrap(), ["Societe Generale"]);
        assert_eq!(entities.get("notional").unwrap(), ["10,000,000"]);
        assert_eq!(entities.get("isin").unwrap(), ["XS1234567890"]);
        assert_eq!(entities.get("maturity").unwrap(), ["15/06/2027", "Five years"]);
        assert_eq!(entities.get("coupon").unwrap(), ["4.5%"]);
        assert_eq!(entities.get("barrier").unwrap(), ["65.5"]);
        assert_eq!(entities.get("trade_date").unwrap(), ["01/02/2024"]);
        assert_eq!(entities.get("currency").unwrap(), ["EUR"]);
    }

    #[test]
    fn test_only_next_cell_is_read() {
        let tables = vec![Table {
            rows: vec![vec!["Counterparty".into(), "Barclays Bank".into(), "London".into()]],
        }];
        let entities = extract_from_tables(&tables);
        assert_eq!(entities.get("counterparty").unwrap(), ["Barclays Bank"]);
    }

    #[test]
    fn test_key_value_scanner() {
        let text = "Client - Deutsche Bank\nNominal: 50 million\nPayment Frequency: Quarterly\nExecution - 2024-03-01\nNo separator here";
        let entities = extract_key_value_pairs(text);

        assert_eq!(entities.get("counterparty").unwrap(), ["Deutsche Bank"]);
        assert_eq!(entities.get("notional").unwrap(), ["50 million"]);
        assert_eq!(entities.get("payment_frequency").unwrap(), ["Quarterly"]);
        assert_eq!(entities.get("trade_date").unwrap(), ["2024-03-01"]);
        assert_eq!(entities.len(), 4);
    }
}
