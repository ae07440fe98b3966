use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

use crate::prompt;
use crate::retry::{RetryPolicy, Transient};

/// One completion call: a system instruction plus the user prompt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub system: String,
    pub prompt: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Ask the model for a JSON object response.
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            system: system.into(),
            prompt: prompt.into(),
            temperature: 0.3,
            max_tokens: 500,
            json_mode: false,
        }
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn json(mut self) -> Self {
        self.json_mode = true;
        self
    }
}

#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String>;

    fn model_name(&self) -> &str;
}

/// Failure of a single chat-completion call.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("Failed to send request to LLM")]
    Transport(#[source] reqwest::Error),

    #[error("LLM request failed: {status}")]
    Status { status: reqwest::StatusCode },

    #[error("Failed to parse LLM response")]
    Decode(#[source] reqwest::Error),

    #[error("LLM response had no content")]
    EmptyResponse,
}

impl Transient for LlmError {
    /// Timeouts, connection failures, rate limits and server errors.
    fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status } => {
                *status == reqwest::StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
            }
            Self::Decode(_) | Self::EmptyResponse => false,
        }
    }
}

/// Client for OpenAI-compatible `/chat/completions` endpoints.
#[derive(Clone)]
pub struct OpenAiClient {
    base_url: String,
    model: String,
    api_key: String,
    client: reqwest::Client,
    retry: RetryPolicy,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

impl OpenAiClient {
    pub fn new(
        base_url: String,
        model: String,
        api_key: String,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build LLM HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            api_key,
            client,
            retry,
        })
    }

    async fn send(&self, request: &CompletionRequest) -> std::result::Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.prompt },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_mode
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::Transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(LlmError::Status { status });
        }

        let chat: ChatResponse = response.json().await.map_err(LlmError::Decode)?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|content| content.trim().to_string())
            .ok_or(LlmError::EmptyResponse)
    }
}

#[async_trait]
impl LanguageModel for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String> {
        debug!(model = %self.model, prompt_chars = request.prompt.len(), "LLM completion");
        let content = self
            .retry
            .run("llm_completion", || self.send(request))
            .await?;
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Strip a surrounding markdown code fence, if any.
fn strip_code_fence(response: &str) -> &str {
    let trimmed = response.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Complete and parse as JSON, asking the model to repair invalid output.
pub async fn complete_json(
    llm: &dyn LanguageModel,
    request: &CompletionRequest,
    max_attempts: usize,
) -> Result<serde_json::Value> {
    for attempt in 0..max_attempts {
        let response = llm.complete(request).await?;

        if let Ok(value) = serde_json::from_str(strip_code_fence(&response)) {
            return Ok(value);
        }

        if attempt + 1 < max_attempts {
            let repair = CompletionRequest {
                prompt: prompt::build_json_repair_prompt(&response),
                ..request.clone()
            };
            let corrected = llm.complete(&repair).await?;
            if let Ok(value) = serde_json::from_str(strip_code_fence(&corrected)) {
                return Ok(value);
            }
        }
    }

    anyhow::bail!("Failed to get valid JSON after {} attempts", max_attempts)
}
