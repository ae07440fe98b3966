//! Keyword and pattern scoring over a fixed category table.

use extract::{EntityMap, title_case};
use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

const KEYWORD_SCORE: f64 = 0.3;
const PATTERN_SCORE: f64 = 0.5;

pub const UNKNOWN: &str = "Unknown";

struct Category {
    name: &'static str,
    keywords: &'static [&'static str],
    patterns: Vec<Regex>,
    weight: f64,
}

fn category(
    name: &'static str,
    keywords: &'static [&'static str],
    patterns: &[&str],
    weight: f64,
) -> Category {
    Category {
        name,
        keywords,
        patterns: patterns.iter().map(|p| Regex::new(p).unwrap()).collect(),
        weight,
    }
}

/// Table order is also the tie-break order.
static CATEGORIES: Lazy<Vec<Category>> = Lazy::new(|| {
    vec![
        category(
            "term_sheet",
            &["term sheet", "termsheet", "terms and conditions", "product terms"],
            &[r"term\s*sheet", r"final\s*terms"],
            1.0,
        ),
        category(
            "trade_confirmation",
            &["trade confirmation", "trade date", "settlement date", "confirmation"],
            &[r"trade\s*confirmation", r"confirmation\s*of\s*trade"],
            1.0,
        ),
        category(
            "trading_chat",
            &["chat", "conversation", "message", "meeting"],
            &[r"\[\d{2}:\d{2}\]", r"\[\d{2}:\d{2}:\d{2}\]"],
            0.9,
        ),
        category(
            "structured_note",
            &[
                "structured note",
                "structured product",
                "capital protected",
                "autocall",
                "barrier",
                "coupon",
            ],
            &[r"structured\s+note", r"capital\s+protected"],
            0.95,
        ),
        category(
            "contract",
            &["agreement", "contract", "isda", "master agreement", "parties"],
            &[r"this\s+agreement", r"master\s+agreement"],
            0.85,
        ),
        category(
            "invoice",
            &["invoice", "bill", "payment due", "total amount", "invoice number"],
            &[r"invoice\s*#?\d+", r"payment\s+due"],
            0.9,
        ),
        category(
            "research_report",
            &["analysis", "research", "recommendation", "target price", "outlook"],
            &[r"price\s+target", r"buy|sell|hold\s+recommendation"],
            0.8,
        ),
        category(
            "general_financial",
            &["financial", "finance", "investment", "portfolio"],
            &[],
            0.5,
        ),
    ]
});

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub document_type: String,
    /// Top three categories by score, highest first.
    pub all_scores: IndexMap<String, f64>,
}

impl ClassificationResult {
    fn unknown() -> Self {
        Self {
            document_type: UNKNOWN.to_string(),
            all_scores: IndexMap::new(),
        }
    }
}

/// Classify `text`, optionally nudged by already-extracted entities.
pub fn classify(text: &str, entities: Option<&EntityMap>) -> ClassificationResult {
    let lower = text.to_lowercase();

    let mut scores: Vec<(&'static str, f64)> = CATEGORIES
        .iter()
        .map(|c| {
            let keyword_hits = c.keywords.iter().filter(|k| lower.contains(*k)).count();
            let pattern_hits = c.patterns.iter().filter(|p| p.is_match(&lower)).count();
            let score =
                keyword_hits as f64 * KEYWORD_SCORE + pattern_hits as f64 * PATTERN_SCORE;
            (c.name, score * c.weight)
        })
        .collect();

    if let Some(entities) = entities {
        apply_entity_boosts(&mut scores, entities);
    }

    let mut best: Option<(&str, f64)> = None;
    for &(name, score) in &scores {
        if best.is_none_or(|(_, top)| score > top) {
            best = Some((name, score));
        }
    }

    let Some((top, top_score)) = best.filter(|(_, s)| *s > 0.0) else {
        return ClassificationResult::unknown();
    };

    scores.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    tracing::debug!(category = top, score = top_score, "Classified document");

    ClassificationResult {
        document_type: display_name(top),
        all_scores: scores
            .into_iter()
            .take(3)
            .map(|(name, score)| (display_name(name), round2(score)))
            .collect(),
    }
}

fn apply_entity_boosts(scores: &mut [(&'static str, f64)], entities: &EntityMap) {
    let mut boost = |name: &str, amount: f64| {
        if let Some((_, score)) = scores.iter_mut().find(|(n, _)| *n == name) {
            *score += amount;
        }
    };

    if entities.has("isin") {
        boost("structured_note", 0.5);
        boost("trade_confirmation", 0.3);
    }
    if entities.has("trade_references") {
        boost("trade_confirmation", 0.6);
    }
    if entities.count("person") > 1 {
        boost("trading_chat", 0.4);
    }
    if entities.has("coupon") && entities.has("barrier") {
        boost("structured_note", 0.6);
    }
}

/// `trade_confirmation` -> `Trade Confirmation`.
fn display_name(category: &str) -> String {
    title_case(&category.replace('_', " "))
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_signal_is_unknown() {
        let result = classify("lorem ipsum dolor sit amet", None);
        assert_eq!(result.document_type, "Unknown");
        assert!(result.all_scores.is_empty());
    }

    #[test]
    fn test_term_sheet() {
        let text = "INDICATIVE TERM SHEET\nFinal Terms of the product terms for a capital protected note";
        let result = classify(text, None);

        assert_eq!(result.document_type, "Term Sheet");
        let labels: Vec<_> = result.all_scores.keys().cloned().collect();
        assert_eq!(labels, vec!["Term Sheet", "Structured Note", "Trade Confirmation"]);
        assert_eq!(result.all_scores["Term Sheet"], 1.6);
        assert_eq!(result.all_scores["Structured Note"], 0.76);
        assert_eq!(result.all_scores["Trade Confirmation"], 0.0);
    }

    #[test]
    fn test_ties_go_to_table_order() {
        // One keyword each for term_sheet and trade_confirmation, both weight 1.0.
        let result = classify("terms and conditions, confirmation", None);
        assert_eq!(result.document_type, "Term Sheet");
        let labels: Vec<_> = result.all_scores.keys().cloned().collect();
        assert_eq!(labels[..2], ["Term Sheet", "Trade Confirmation"]);
    }

    #[test]
    fn test_entity_boosts() {
        let mut entities = EntityMap::new();
        entities.extend("person", ["Alice", "Bob"]);

        let result = classify("[09:15] ok", Some(&entities));
        assert_eq!(result.document_type, "Trading Chat");
        assert_eq!(result.all_scores["Trading Chat"], 0.85);

        let mut note = EntityMap::new();
        note.push("isin", "US0378331005");
        note.push("coupon", "5%");
        note.push("barrier", "60");
        let result = classify("nothing else", Some(&note));
        assert_eq!(result.document_type, "Structured Note");
        assert_eq!(result.all_scores["Structured Note"], 1.1);
        assert_eq!(result.all_scores["Trade Confirmation"], 0.3);
    }

    #[test]
    fn test_deterministic() {
        let text = "ISDA Master Agreement between the parties; invoice #42 payment due";
        assert_eq!(classify(text, None), classify(text, None));
    }
}
