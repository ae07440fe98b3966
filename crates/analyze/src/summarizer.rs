use std::sync::Arc;

use extract::{CompletionRequest, LanguageModel, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::{error, info};

/// Texts shorter than this are returned as their own summary.
const MIN_SUMMARY_CHARS: usize = 100;
const SUMMARY_CONTEXT_CHARS: usize = 3000;

const SUMMARY_SYSTEM: &str =
    "You are a financial document analyst. Provide concise, accurate summaries.";

const NO_LLM_MESSAGE: &str = "Summarization requires an OpenAI API key.";
const FAILED_MESSAGE: &str = "Failed to generate summary.";

static WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static DISALLOWED: Lazy<Regex> = Lazy::new(|| Regex::new(r#"[^\w\s.,!?;:()\-'"]+"#).unwrap());

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryMethod {
    Original,
    Llm,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub summary: String,
    pub method: SummaryMethod,
    /// Words in the summary.
    pub length: usize,
    /// Words in the cleaned input.
    pub original_length: usize,
}

#[derive(Clone, Default)]
pub struct DocumentSummarizer {
    llm: Option<Arc<dyn LanguageModel>>,
}

impl DocumentSummarizer {
    pub fn new(llm: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { llm }
    }

    pub async fn summarize(&self, text: &str) -> SummaryResult {
        let text = clean_for_summary(text);
        let original_length = word_count(&text);

        if text.chars().count() < MIN_SUMMARY_CHARS {
            return SummaryResult {
                length: original_length,
                summary: text,
                method: SummaryMethod::Original,
                original_length,
            };
        }

        let Some(llm) = &self.llm else {
            return SummaryResult::error(NO_LLM_MESSAGE, original_length);
        };

        match generate_summary(llm.as_ref(), &text).await {
            Ok(summary) if !summary.is_empty() => {
                info!(words = word_count(&summary), "Generated summary");
                SummaryResult {
                    length: word_count(&summary),
                    summary,
                    method: SummaryMethod::Llm,
                    original_length,
                }
            }
            Ok(_) => SummaryResult::error(FAILED_MESSAGE, original_length),
            Err(e) => {
                error!(error = %e, "Summarization failed");
                SummaryResult::error(FAILED_MESSAGE, original_length)
            }
        }
    }
}

impl SummaryResult {
    fn error(message: &str, original_length: usize) -> Self {
        Self {
            summary: message.to_string(),
            method: SummaryMethod::Error,
            length: 0,
            original_length,
        }
    }
}

/// Collapse whitespace and strip everything but word characters and basic punctuation.
pub fn clean_for_summary(text: &str) -> String {
    let collapsed = WHITESPACE.replace_all(text, " ");
    DISALLOWED.replace_all(&collapsed, "").trim().to_string()
}

fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

async fn generate_summary(llm: &dyn LanguageModel, text: &str) -> anyhow::Result<String> {
    let mut sample = truncate_chars(text, SUMMARY_CONTEXT_CHARS).to_string();
    if sample.len() < text.len() {
        sample.push_str("...");
    }

    let prompt = format!(
        "Summarize this financial document in 2-3 concise sentences. Focus on:\n\
         - Key financial terms (amounts, dates, rates)\n\
         - Main parties involved\n\
         - Purpose or type of document\n\n\
         Document:\n{}\n\n\
         Summary:",
        sample
    );

    let request = CompletionRequest::new(SUMMARY_SYSTEM, prompt)
        .temperature(0.3)
        .max_tokens(150);

    Ok(llm.complete(&request).await?.trim().to_string())
}
