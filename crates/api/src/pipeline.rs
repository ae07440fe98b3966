use std::sync::Arc;

use analyze::{
    DEFAULT_MAX_TOPICS, DocumentSummarizer, FormattedReport, ReportInput, TopicModeller,
    build_report, classify,
};
use anyhow::Result;
use extract::{
    EntityRecognizer, Extractor, HttpRecognizer, LanguageModel, OpenAiClient, RetryPolicy,
};
use ingest::{DecodeError, FileReader};
use tracing::{info, warn};

use crate::cache::{CachedLanguageModel, LlmCache};
use crate::config::AppConfig;
use crate::metrics::{Metrics, TimedOperation};

/// Decode, extract, analyze and format one upload.
pub struct DocumentPipeline {
    reader: FileReader,
    extractor: Extractor,
    summarizer: DocumentSummarizer,
    topics: TopicModeller,
    metrics: Arc<Metrics>,
}

impl DocumentPipeline {
    pub fn new(
        max_file_size_mb: u64,
        llm: Option<Arc<dyn LanguageModel>>,
        recognizer: Option<Arc<dyn EntityRecognizer>>,
        metrics: Arc<Metrics>,
    ) -> Self {
        let mut extractor = Extractor::new();
        if let Some(llm) = &llm {
            extractor = extractor.with_llm(llm.clone());
        }
        if let Some(recognizer) = recognizer {
            extractor = extractor.with_recognizer(recognizer);
        }

        Self {
            reader: FileReader::new(max_file_size_mb),
            extractor,
            summarizer: DocumentSummarizer::new(llm.clone()),
            topics: TopicModeller::new(llm),
            metrics,
        }
    }

    pub async fn process(
        &self,
        content: &[u8],
        filename: &str,
    ) -> std::result::Result<FormattedReport, DecodeError> {
        let timer = TimedOperation::start();
        let document = self.reader.read(content, filename)?;
        let extraction = self.extractor.extract(&document).await;
        self.metrics
            .record_extract(timer.elapsed(), extraction.entities.total_values());

        let timer = TimedOperation::start();
        let classification = classify(&extraction.text, Some(&extraction.entities));
        let summary = self.summarizer.summarize(&extraction.text).await;
        let topics = self
            .topics
            .extract_topics(&extraction.text, DEFAULT_MAX_TOPICS)
            .await;
        self.metrics.record_analysis(timer.elapsed());

        info!(
            document_type = %classification.document_type,
            entities = extraction.entities.total_values(),
            "Document processed"
        );

        Ok(build_report(ReportInput {
            filename,
            file_type: extraction.file_type,
            method: extraction.method,
            entities: &extraction.entities,
            classification,
            summary,
            topics,
        }))
    }
}

/// Language model from config: OpenAI client with retry, optionally cached.
pub fn build_llm(
    config: &AppConfig,
    cache: Option<Arc<LlmCache>>,
) -> Result<Option<Arc<dyn LanguageModel>>> {
    let Some(api_key) = &config.llm.api_key else {
        warn!("No OpenAI API key configured; summaries, topics, PDF extraction and Q&A are degraded");
        return Ok(None);
    };

    let retry = RetryPolicy::new(
        config.retry.max_retries,
        config.retry.initial_backoff_ms,
        config.retry.max_backoff_ms,
    );
    let client: Arc<dyn LanguageModel> = Arc::new(OpenAiClient::new(
        config.llm.base_url.clone(),
        config.llm.model.clone(),
        api_key.clone(),
        config.llm_timeout(),
        retry,
    )?);
    info!(model = %config.llm.model, "LLM client initialized");

    Ok(Some(match cache {
        Some(cache) => Arc::new(CachedLanguageModel::new(client, cache)),
        None => client,
    }))
}

pub fn build_recognizer(config: &AppConfig) -> Result<Option<Arc<dyn EntityRecognizer>>> {
    let Some(url) = &config.recognizer.url else {
        warn!("No NER service configured; chat extraction is rule-based");
        return Ok(None);
    };

    let recognizer = HttpRecognizer::new(url.clone(), config.recognizer_timeout())?;
    info!(url = %url, "Entity recognizer configured");
    Ok(Some(Arc::new(recognizer)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use extract::CompletionRequest;

    struct Echo;

    #[async_trait]
    impl LanguageModel for Echo {
        async fn complete(&self, _request: &CompletionRequest) -> Result<String> {
            Ok("A short summary.".to_string())
        }

        fn model_name(&self) -> &str {
            "echo"
        }
    }

    fn pipeline(llm: Option<Arc<dyn LanguageModel>>) -> DocumentPipeline {
        DocumentPipeline::new(1, llm, None, Metrics::new())
    }

    #[tokio::test]
    async fn test_chat_upload_produces_report() {
        let chat = b"[10:02] trader1: per our chat, GS looking for 200 mio 5Y estr+45bps quarterly\n\
                     [10:03] trader2: ISIN FR0000131104";

        let report = pipeline(None).process(chat, "chat.txt").await.unwrap();

        assert!(report.success);
        assert_eq!(report.metadata.filename, "chat.txt");
        assert_eq!(report.metadata.extraction_method, extract::ExtractionMethod::RuleBased);
        assert_eq!(report.classification.document_type, "Trading Chat");
        assert_eq!(report.topics.method, analyze::TopicMethod::Fallback);
        assert_eq!(report.metadata.entity_count, report.entities.len());
        assert!(report.entities.iter().any(|e| e.entity_type == "isin" && e.value == "FR0000131104"));
    }

    #[tokio::test]
    async fn test_summary_uses_llm_when_available() {
        let text = "This trade confirmation documents an interest rate swap between two banks \
                    with a notional of EUR 50 million, settlement date 2024-03-01, maturity 2029.";
        let report = pipeline(Some(Arc::new(Echo)))
            .process(text.as_bytes(), "swap.txt")
            .await
            .unwrap();

        assert_eq!(report.summary.method, analyze::SummaryMethod::Llm);
        assert_eq!(report.summary.summary, "A short summary.");
        assert_eq!(report.classification.document_type, "Trade Confirmation");
    }

    #[tokio::test]
    async fn test_decode_errors_propagate() {
        let err = pipeline(None).process(b"\x00\x01\x02\xff", "data.bin").await.unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(_)));

        let big = vec![b'a'; 2 * 1024 * 1024];
        let err = pipeline(None).process(&big, "big.txt").await.unwrap_err();
        assert!(matches!(err, DecodeError::PayloadTooLarge { .. }));
    }

    #[test]
    fn test_build_llm_without_key() {
        assert!(build_llm(&AppConfig::default(), None).unwrap().is_none());
        assert!(build_recognizer(&AppConfig::default()).unwrap().is_none());
    }
}
