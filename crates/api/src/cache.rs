use async_trait::async_trait;
use dashmap::DashMap;
use extract::{CompletionRequest, LanguageModel};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::debug;

/// LLM responses keyed by a hash of model and request.
pub struct LlmCache {
    responses: DashMap<String, String>,
    max_entries: usize,
    hits: AtomicUsize,
    misses: AtomicUsize,
}

impl LlmCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            responses: DashMap::new(),
            max_entries,
            hits: AtomicUsize::new(0),
            misses: AtomicUsize::new(0),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        match self.responses.get(key) {
            Some(entry) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                Some(entry.value().clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    pub fn insert(&self, key: String, response: String) {
        if self.max_entries == 0 {
            return;
        }
        if self.responses.len() >= self.max_entries {
            // Simple eviction: clear 25% when full
            let to_remove: Vec<_> = self
                .responses
                .iter()
                .take((self.max_entries / 4).max(1))
                .map(|r| r.key().clone())
                .collect();
            for key in to_remove {
                self.responses.remove(&key);
            }
        }
        self.responses.insert(key, response);
    }

    pub fn key_for(model: &str, request: &CompletionRequest) -> String {
        let mut hasher = Sha256::new();
        hasher.update(model.as_bytes());
        hasher.update([0]);
        hasher.update(request.system.as_bytes());
        hasher.update([0]);
        hasher.update(request.prompt.as_bytes());
        hasher.update(request.temperature.to_le_bytes());
        hasher.update(request.max_tokens.to_le_bytes());
        hasher.update([request.json_mode as u8]);
        hex::encode(hasher.finalize())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            llm_responses_cached: self.responses.len(),
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct CacheStats {
    pub llm_responses_cached: usize,
    pub hits: usize,
    pub misses: usize,
}

/// Serves repeated requests from the cache; only successes are stored.
pub struct CachedLanguageModel {
    inner: Arc<dyn LanguageModel>,
    cache: Arc<LlmCache>,
}

impl CachedLanguageModel {
    pub fn new(inner: Arc<dyn LanguageModel>, cache: Arc<LlmCache>) -> Self {
        Self { inner, cache }
    }
}

#[async_trait]
impl LanguageModel for CachedLanguageModel {
    async fn complete(&self, request: &CompletionRequest) -> anyhow::Result<String> {
        let key = LlmCache::key_for(self.inner.model_name(), request);
        if let Some(cached) = self.cache.get(&key) {
            debug!("LLM cache hit");
            return Ok(cached);
        }

        let response = self.inner.complete(request).await?;
        self.cache.insert(key, response.clone());
        Ok(response)
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}
