use std::sync::Arc;

use extract::{CompletionRequest, LanguageModel, complete_json, truncate_chars};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

pub const DEFAULT_MAX_TOPICS: usize = 5;
const TOPIC_CONTEXT_CHARS: usize = 3000;
const TOP_KEYWORDS: usize = 10;
/// Attempts at getting parseable JSON from the model.
const JSON_ATTEMPTS: usize = 2;

const TOPIC_SYSTEM: &str = "You are a financial document analyst. Return valid JSON only.";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub name: String,
    #[serde(default)]
    pub relevance: f64,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TopicMethod {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicResult {
    pub topics: Vec<Topic>,
    pub top_keywords: Vec<String>,
    pub overall_theme: String,
    /// Topics the model returned, before truncation.
    pub num_topics: usize,
    pub method: TopicMethod,
}

#[derive(Deserialize)]
struct TopicResponse {
    #[serde(default)]
    topics: Vec<Topic>,
    overall_theme: Option<String>,
}

impl TopicResult {
    pub fn fallback() -> Self {
        let keywords: Vec<String> = ["financial", "document", "terms"]
            .iter()
            .map(|k| k.to_string())
            .collect();

        Self {
            topics: vec![Topic {
                name: "Financial Document".to_string(),
                relevance: 0.7,
                keywords: keywords.clone(),
                description: "General financial document".to_string(),
            }],
            top_keywords: keywords,
            overall_theme: "Financial document".to_string(),
            num_topics: 1,
            method: TopicMethod::Fallback,
        }
    }
}

#[derive(Clone, Default)]
pub struct TopicModeller {
    llm: Option<Arc<dyn LanguageModel>>,
}

impl TopicModeller {
    pub fn new(llm: Option<Arc<dyn LanguageModel>>) -> Self {
        Self { llm }
    }

    pub async fn extract_topics(&self, text: &str, max_topics: usize) -> TopicResult {
        let Some(llm) = &self.llm else {
            return TopicResult::fallback();
        };

        match request_topics(llm.as_ref(), text, max_topics).await {
            Ok(result) => {
                info!(topics = result.num_topics, "Extracted topics");
                result
            }
            Err(e) => {
                error!(error = %e, "Topic extraction failed");
                TopicResult::fallback()
            }
        }
    }
}

async fn request_topics(
    llm: &dyn LanguageModel,
    text: &str,
    max_topics: usize,
) -> anyhow::Result<TopicResult> {
    let sample = truncate_chars(text, TOPIC_CONTEXT_CHARS);

    let prompt = format!(
        r#"Analyze this financial document and extract {max_topics} main topics.

Document:
{sample}

Return valid JSON with this structure:
{{
  "topics": [
    {{
      "name": "Topic Name",
      "relevance": 0.95,
      "keywords": ["keyword1", "keyword2", "keyword3"],
      "description": "Brief description"
    }}
  ],
  "overall_theme": "One sentence main theme"
}}

Focus on financial topics: structured products, trading, derivatives, investment, risk management, etc.
Relevance: 0-1 scale."#
    );

    let request = CompletionRequest::new(TOPIC_SYSTEM, prompt)
        .temperature(0.3)
        .max_tokens(500)
        .json();

    let value = complete_json(llm, &request, JSON_ATTEMPTS).await?;
    let response: TopicResponse = serde_json::from_value(value)?;

    let mut top_keywords: Vec<String> = Vec::new();
    for keyword in response.topics.iter().flat_map(|t| &t.keywords) {
        if top_keywords.len() == TOP_KEYWORDS {
            break;
        }
        if !top_keywords.contains(keyword) {
            top_keywords.push(keyword.clone());
        }
    }

    let num_topics = response.topics.len();
    let mut topics = response.topics;
    topics.truncate(max_topics);

    Ok(TopicResult {
        topics,
        top_keywords,
        overall_theme: response
            .overall_theme
            .unwrap_or_else(|| "Financial document".to_string()),
        num_topics,
        method: TopicMethod::Llm,
    })
}
