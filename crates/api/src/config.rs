use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

/// Placeholder shipped in sample `.env` files; treated as "no key".
const PLACEHOLDER_API_KEY: &str = "your_openai_api_key_here";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub limits: LimitsConfig,
    pub llm: LlmConfig,
    pub recognizer: RecognizerConfig,
    pub retry: RetryConfig,
    pub cache: CacheConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    pub max_file_size_mb: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    /// `None` disables every model-backed feature.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizerConfig {
    pub url: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub enabled: bool,
    pub max_entries: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig { port: 8000 },
            limits: LimitsConfig {
                max_file_size_mb: ingest::DEFAULT_MAX_FILE_SIZE_MB,
            },
            llm: LlmConfig {
                api_key: None,
                model: "gpt-4o-mini".to_string(),
                base_url: "https://api.openai.com/v1".to_string(),
                timeout_secs: 60,
            },
            recognizer: RecognizerConfig {
                url: None,
                timeout_secs: 30,
            },
            retry: RetryConfig {
                max_retries: 2,
                initial_backoff_ms: 500,
                max_backoff_ms: 8000,
            },
            cache: CacheConfig {
                enabled: true,
                max_entries: 1000,
            },
        }
    }
}

impl AppConfig {
    /// Load from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(port) = parse(&lookup, "PORT")? {
            config.server.port = port;
        }
        if let Some(max) = parse(&lookup, "MAX_FILE_SIZE_MB")? {
            config.limits.max_file_size_mb = max;
        }

        config.llm.api_key = lookup("OPENAI_API_KEY")
            .map(|key| key.trim().to_string())
            .filter(|key| !key.is_empty() && key != PLACEHOLDER_API_KEY);
        if let Some(model) = lookup("OPENAI_MODEL") {
            config.llm.model = model;
        }
        if let Some(base_url) = lookup("OPENAI_BASE_URL") {
            config.llm.base_url = base_url;
        }
        if let Some(timeout) = parse(&lookup, "LLM_TIMEOUT_SECS")? {
            config.llm.timeout_secs = timeout;
        }

        config.recognizer.url = lookup("NER_SERVICE_URL").filter(|url| !url.trim().is_empty());

        if let Some(retries) = parse(&lookup, "LLM_MAX_RETRIES")? {
            config.retry.max_retries = retries;
        }
        if let Some(enabled) = parse(&lookup, "LLM_CACHE_ENABLED")? {
            config.cache.enabled = enabled;
        }
        if let Some(max_entries) = parse(&lookup, "LLM_CACHE_MAX_ENTRIES")? {
            config.cache.max_entries = max_entries;
        }

        Ok(config)
    }

    pub fn llm_enabled(&self) -> bool {
        self.llm.api_key.is_some()
    }

    pub fn llm_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_secs)
    }

    pub fn recognizer_timeout(&self) -> Duration {
        Duration::from_secs(self.recognizer.timeout_secs)
    }
}

fn parse<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{} must be a valid value, got {:?}", key, raw))
        })
        .transpose()
}
