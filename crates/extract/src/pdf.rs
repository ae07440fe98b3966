//! Model-driven extraction for PDF text, with the pattern library as fallback.

use tracing::{info, warn};

use crate::llm::{CompletionRequest, LanguageModel};
use crate::merge::merge;
use crate::patterns;
use crate::prompt::{self, EXTRACTION_SYSTEM};
use crate::schema::{EntityMap, ExtractionMethod};

/// Values the model uses to say "nothing here".
const SENTINELS: &[&str] = &["not found", "n/a", "none", "-", "", "not specified"];

/// Response key aliases per entity type.
const KEY_ALIASES: &[(&str, &[&str])] = &[
    ("counterparty", &["counterparty", "issuer", "party", "investor"]),
    ("notional", &["notional", "principal", "amount", "investment"]),
    ("isin", &["isin"]),
    ("underlying", &["underlying", "reference", "asset", "instrument"]),
    ("maturity", &["maturity", "maturity_date", "expiry", "exit"]),
    ("coupon", &["coupon", "interest_rate", "dividend", "irr", "return"]),
    ("barrier", &["barrier", "threshold", "multiplier"]),
    ("trade_date", &["trade_date", "issue_date", "date"]),
    ("currency", &["currency"]),
    ("payment_frequency", &["payment_frequency", "frequency"]),
    ("strike_price", &["strike_price", "strike"]),
];

/// Parse `KEY: value` lines. Unknown keys, sentinel values and lines
/// without a colon are ignored.
pub fn parse_llm_response(response: &str) -> EntityMap {
    let mut entities = EntityMap::new();

    for line in response.trim().lines() {
        let Some((key, value)) = line.split_once(':') else {
            continue;
        };
        let key = key.trim().to_lowercase();
        let value = value.trim();

        if SENTINELS.contains(&value.to_lowercase().as_str()) {
            continue;
        }

        if let Some((entity_type, _)) = KEY_ALIASES
            .iter()
            .find(|(_, aliases)| aliases.contains(&key.as_str()))
        {
            entities.push(entity_type, value);
        }
    }

    entities
}

/// Extract from already-cleaned PDF text.
pub async fn extract_pdf(
    text: &str,
    llm: Option<&dyn LanguageModel>,
) -> (ExtractionMethod, EntityMap) {
    let (method, entities) = match llm {
        Some(llm) => match extract_with_llm(text, llm).await {
            Ok(entities) => (ExtractionMethod::LlmExtraction, entities),
            Err(e) => {
                warn!(error = %e, "LLM extraction failed, using pattern library");
                (ExtractionMethod::RuleBased, patterns::extract_all(text))
            }
        },
        None => (ExtractionMethod::RuleBased, patterns::extract_all(text)),
    };

    (method, merge(&[entities]))
}

async fn extract_with_llm(text: &str, llm: &dyn LanguageModel) -> anyhow::Result<EntityMap> {
    let request = CompletionRequest::new(EXTRACTION_SYSTEM, prompt::build_extraction_prompt(text))
        .temperature(0.1)
        .max_tokens(2000);

    let response = llm.complete(&request).await?;
    let entities = parse_llm_response(&response);

    info!(
        model = llm.model_name(),
        total = entities.total_values(),
        types = entities.len(),
        "LLM extraction complete"
    );

    Ok(entities)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::tests::ScriptedModel;

    #[test]
    fn test_parse_aliases_and_sentinels() {
        let response = "\
COUNTERPARTY: Acme Capital
INVESTOR: Blue Fund LP
NOTIONAL: INR 50,00,00,000
ISIN: Not found
IRR: 18%
DATE: 12 March 2024
STRIKE: 110.5
BARRIER: N/A
Some commentary without a separator
RANDOM_KEY: ignored
Maturity: 5 years: extendable";

        let entities = parse_llm_response(response);

        assert_eq!(entities.get("counterparty").unwrap(), ["Acme Capital", "Blue Fund LP"]);
        assert_eq!(entities.get("notional").unwrap(), ["INR 50,00,00,000"]);
        assert_eq!(entities.get("coupon").unwrap(), ["18%"]);
        assert_eq!(entities.get("trade_date").unwrap(), ["12 March 2024"]);
        assert_eq!(entities.get("strike_price").unwrap(), ["110.5"]);
        assert_eq!(entities.get("maturity").unwrap(), ["5 years: extendable"]);
        assert!(entities.get("isin").is_none());
        assert!(entities.get("barrier").is_none());
        assert_eq!(entities.len(), 6);
    }

    #[tokio::test]
    async fn test_llm_path_is_merged() {
        let model = ScriptedModel::new(vec![Ok(
            "COUNTERPARTY: Acme Capital\nISSUER: acme capital\nCOUPON: 7%",
        )]);

        let (method, entities) = extract_pdf("some pdf text", Some(&model)).await;

        assert_eq!(method, ExtractionMethod::LlmExtraction);
        assert_eq!(entities.get("counterparty").unwrap(), ["Acme Capital"]);
        assert_eq!(entities.get("coupon").unwrap(), ["7%"]);
    }

    #[tokio::test]
    async fn test_falls_back_to_patterns() {
        let text = "Coupon: 6.5% ISIN XS1234567890";
        let model = ScriptedModel::new(vec![Err("rate limited")]);

        let (method, failed) = extract_pdf(text, Some(&model)).await;
        assert_eq!(method, ExtractionMethod::RuleBased);

        let (method, without) = extract_pdf(text, None).await;
        assert_eq!(method, ExtractionMethod::RuleBased);

        assert_eq!(failed, without);
        assert_eq!(without.get("isin").unwrap(), ["XS1234567890"]);
        assert_eq!(without.get("coupon").unwrap(), ["6.5%"]);
    }
}
