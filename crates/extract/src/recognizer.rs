use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A typed span returned by a named-entity recognizer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedSpan {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
}

#[async_trait]
pub trait EntityRecognizer: Send + Sync {
    async fn recognize(&self, text: &str) -> Result<Vec<RecognizedSpan>>;
}

/// Recognizer served over HTTP (e.g. a spaCy model behind a small web service).
#[derive(Clone)]
pub struct HttpRecognizer {
    url: String,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct RecognizeRequest<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct RecognizeResponse {
    entities: Vec<RecognizedSpan>,
}

impl HttpRecognizer {
    pub fn new(url: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build recognizer HTTP client")?;
        Ok(Self { url, client })
    }
}

#[async_trait]
impl EntityRecognizer for HttpRecognizer {
    async fn recognize(&self, text: &str) -> Result<Vec<RecognizedSpan>> {
        let response = self
            .client
            .post(&self.url)
            .json(&RecognizeRequest { text })
            .send()
            .await
            .context("Failed to send request to recognizer")?;

        if !response.status().is_success() {
            anyhow::bail!("Recognizer request failed: {}", response.status());
        }

        let parsed: RecognizeResponse = response
            .json()
            .await
            .context("Failed to parse recognizer response")?;

        Ok(parsed.entities)
    }
}
