//! Free-text extraction for chats and plain messages.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

use crate::merge::{merge, post_process};
use crate::normalizer::clean_text;
use crate::patterns::{self, ISIN};
use crate::recognizer::{EntityRecognizer, RecognizedSpan};
use crate::schema::{EntityMap, ExtractionMethod, RecognizedEntity};

static NOTIONAL_PHRASE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\d+)\s*(mio|million|bn|billion)").unwrap());

static RATE_SPREAD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(\w+\s*[+\-]\s*\d+\s*bps)").unwrap());

static PAYMENT_FREQUENCY: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(Quarterly|Monthly|Semi-annually|Annually)\b").unwrap());

static TENOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(\d+Y)\b").unwrap());

static UNDERLYING_RATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(estr|euribor|libor|sofr)\b").unwrap());

/// Recognizer label to the entity types it feeds. Unlisted labels are dropped.
const LABEL_TYPES: &[(&str, &[&str])] = &[
    ("ORG", &["counterparty", "organizations"]),
    ("PERSON", &["person"]),
    ("MONEY", &["currency_amounts"]),
    ("DATE", &["dates"]),
    ("PERCENT", &["percentages"]),
    ("CARDINAL", &["numbers"]),
    ("GPE", &["locations"]),
];

/// Output order of recognizer-derived types.
const RECOGNIZER_TYPES: &[&str] = &[
    "counterparty",
    "person",
    "currency_amounts",
    "dates",
    "percentages",
    "numbers",
    "organizations",
    "locations",
];

/// Heuristic confidence for a recognizer span.
pub fn confidence_for(label: &str, text: &str) -> f64 {
    let base: f64 = match label {
        "ORG" => 0.85,
        "PERSON" => 0.80,
        "MONEY" => 0.90,
        "DATE" => 0.85,
        "PERCENT" => 0.88,
        "CARDINAL" => 0.75,
        "GPE" => 0.82,
        "PRODUCT" => 0.78,
        _ => 0.70,
    };

    let len = text.chars().count();
    let adjusted = if len > 15 {
        base + 0.05
    } else if len < 3 {
        base - 0.10
    } else {
        base
    };

    adjusted.clamp(0.50, 0.95)
}

/// Attach a confidence to every span, keeping the recognizer's order.
pub fn score_spans(spans: Vec<RecognizedSpan>) -> Vec<RecognizedEntity> {
    spans
        .into_iter()
        .map(|span| RecognizedEntity {
            confidence: confidence_for(&span.label, &span.text),
            text: span.text,
            label: span.label,
            start: span.start,
            end: span.end,
        })
        .collect()
}

/// Map recognizer labels onto financial entity types.
pub fn map_recognized(entities: &[RecognizedEntity]) -> EntityMap {
    let mut by_type: Vec<(&str, Vec<String>)> =
        RECOGNIZER_TYPES.iter().map(|t| (*t, Vec::new())).collect();

    for entity in entities {
        let Some((_, targets)) = LABEL_TYPES.iter().find(|(label, _)| *label == entity.label)
        else {
            continue;
        };
        for target in *targets {
            if let Some((_, values)) = by_type.iter_mut().find(|(t, _)| t == target) {
                values.push(entity.text.clone());
            }
        }
    }

    let mut mapped = EntityMap::new();
    for (entity_type, values) in by_type {
        mapped.extend(entity_type, values);
    }
    mapped
}

/// Regexes for the shorthand traders use in chats ("200 mio", "estr+45bps", "5Y").
pub fn extract_chat_specific(text: &str) -> EntityMap {
    let mut entities = EntityMap::new();

    entities.extend("isin", patterns::find_all(&ISIN, text));

    entities.extend(
        "notional",
        NOTIONAL_PHRASE
            .captures_iter(text)
            .map(|caps| format!("{} {}", &caps[1], &caps[2])),
    );

    entities.extend("interest_rate", patterns::capture_all(&RATE_SPREAD, text));

    entities.extend(
        "payment_frequency",
        unique(patterns::capture_all(&PAYMENT_FREQUENCY, text)),
    );

    entities.extend("tenor", patterns::capture_all(&TENOR, text));

    entities.extend(
        "underlying",
        unique(
            patterns::capture_all(&UNDERLYING_RATE, text)
                .into_iter()
                .map(|u| u.to_lowercase())
                .collect(),
        ),
    );

    entities
}

fn unique(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

/// Recognizer, pattern library and chat regexes, merged and post-processed.
///
/// Without a recognizer (or when it errors) the recognizer stage is skipped
/// and the method is reported as rule-based.
pub async fn extract_free_text(
    text: &str,
    recognizer: Option<&dyn EntityRecognizer>,
) -> (ExtractionMethod, EntityMap) {
    let cleaned = clean_text(text);

    let (method, recognized) = match recognizer {
        Some(recognizer) => match recognizer.recognize(&cleaned).await {
            Ok(spans) => {
                let scored = score_spans(spans);
                debug!(spans = scored.len(), "Recognizer returned spans");
                (ExtractionMethod::NerModel, map_recognized(&scored))
            }
            Err(e) => {
                warn!(error = %e, "Entity recognizer failed, using rule-based extraction");
                (ExtractionMethod::RuleBased, EntityMap::new())
            }
        },
        None => {
            warn!("No entity recognizer configured, using rule-based extraction");
            (ExtractionMethod::RuleBased, EntityMap::new())
        }
    };

    let pattern_entities = patterns::extract_all(&cleaned);
    let chat_entities = extract_chat_specific(&cleaned);

    let merged = merge(&[recognized, pattern_entities, chat_entities]);
    (method, post_process(&merged))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;

    struct FixedRecognizer(Vec<RecognizedSpan>);

    #[async_trait]
    impl EntityRecognizer for FixedRecognizer {
        async fn recognize(&self, _text: &str) -> anyhow::Result<Vec<RecognizedSpan>> {
            Ok(self.0.clone())
        }
    }

    struct DownRecognizer;

    #[async_trait]
    impl EntityRecognizer for DownRecognizer {
        async fn recognize(&self, _text: &str) -> anyhow::Result<Vec<RecognizedSpan>> {
            anyhow::bail!("connection refused")
        }
    }

    fn span(text: &str, label: &str) -> RecognizedSpan {
        RecognizedSpan {
            text: text.to_string(),
            label: label.to_string(),
            start: 0,
            end: text.len(),
        }
    }

    #[test]
    fn test_confidence_clamp() {
        assert!((confidence_for("ORG", "Goldman Sachs Bank U") - 0.90).abs() < 1e-9);
        assert!((confidence_for("WORK_OF_ART", "ab") - 0.60).abs() < 1e-9);
        assert!((confidence_for("MONEY", "EUR 1,000,000,000,000") - 0.95).abs() < 1e-9);
        assert!((confidence_for("CARDINAL", "7") - 0.65).abs() < 1e-9);
    }

    #[test]
    fn test_label_mapping() {
        let scored = score_spans(vec![
            span("Barclays", "ORG"),
            span("John Smith", "PERSON"),
            span("London", "GPE"),
            span("Tuesday", "DATE"),
            span("first", "ORDINAL"),
        ]);
        let mapped = map_recognized(&scored);

        assert_eq!(mapped.get("counterparty").unwrap(), ["Barclays"]);
        assert_eq!(mapped.get("organizations").unwrap(), ["Barclays"]);
        assert_eq!(mapped.get("person").unwrap(), ["John Smith"]);
        assert_eq!(mapped.get("locations").unwrap(), ["London"]);
        assert_eq!(mapped.get("dates").unwrap(), ["Tuesday"]);
        assert_eq!(mapped.len(), 5);
    }

    #[test]
    fn test_chat_regexes() {
        let text = "Can we do 200 mio 5Y at estr+45bps, Quarterly payments, quarterly reset on ESTR? ISIN FR0000131104";
        let entities = extract_chat_specific(text);

        assert_eq!(entities.get("isin").unwrap(), ["FR0000131104"]);
        assert_eq!(entities.get("notional").unwrap(), ["200 mio"]);
        assert_eq!(entities.get("interest_rate").unwrap(), ["estr+45bps"]);
        assert_eq!(
            entities.get("payment_frequency").unwrap(),
            ["Quarterly", "quarterly"]
        );
        assert_eq!(entities.get("tenor").unwrap(), ["5Y"]);
        assert_eq!(entities.get("underlying").unwrap(), ["estr"]);
    }

    #[tokio::test]
    async fn test_free_text_with_recognizer() {
        let recognizer = FixedRecognizer(vec![span("GS", "ORG"), span("Goldman Sachs", "ORG")]);
        let (method, entities) =
            extract_free_text("GS wants 500 million\n\n2Y  sofr", Some(&recognizer)).await;

        assert_eq!(method, ExtractionMethod::NerModel);
        assert_eq!(entities.get("counterparty").unwrap(), ["Goldman Sachs"]);
        assert_eq!(entities.get("notional").unwrap(), ["500 million"]);
        assert_eq!(entities.get("tenor").unwrap(), ["2Y"]);
        assert_eq!(entities.get("underlying").unwrap(), ["sofr"]);
    }

    #[tokio::test]
    async fn test_free_text_falls_back() {
        let text = "Issuer: BNP Paribas, 100 bn Annually";

        let (method, down) = extract_free_text(text, Some(&DownRecognizer)).await;
        assert_eq!(method, ExtractionMethod::RuleBased);

        let (method, none) = extract_free_text(text, None).await;
        assert_eq!(method, ExtractionMethod::RuleBased);

        assert_eq!(down, none);
        assert_eq!(none.get("notional").unwrap(), ["100 bn"]);
        assert_eq!(none.get("payment_frequency").unwrap(), ["Annually"]);
    }
}
