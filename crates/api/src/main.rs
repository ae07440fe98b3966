mod cache;
mod config;
mod error;
mod metrics;
mod pipeline;
mod routes;

use std::sync::Arc;

use anyhow::Context;
use query::SessionStore;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cache::LlmCache;
use crate::config::AppConfig;
use crate::metrics::Metrics;
use crate::pipeline::{DocumentPipeline, build_llm, build_recognizer};
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    info!(
        port = config.server.port,
        max_file_size_mb = config.limits.max_file_size_mb,
        llm_enabled = config.llm_enabled(),
        cache_enabled = config.cache.enabled,
        "Configuration loaded"
    );

    let cache = config
        .cache
        .enabled
        .then(|| Arc::new(LlmCache::new(config.cache.max_entries)));
    let llm = build_llm(&config, cache.clone()).context("Failed to create LLM client")?;
    let recognizer = build_recognizer(&config).context("Failed to create NER client")?;
    let recognizer_configured = recognizer.is_some();

    let metrics = Metrics::new();
    let pipeline = DocumentPipeline::new(
        config.limits.max_file_size_mb,
        llm.clone(),
        recognizer,
        metrics.clone(),
    );

    let port = config.server.port;
    let state = Arc::new(AppState {
        config,
        pipeline,
        sessions: SessionStore::new(),
        llm,
        recognizer_configured,
        metrics,
        cache,
    });

    let app = routes::router(state);

    let addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
