pub mod chat;
pub mod llm;
pub mod merge;
pub mod normalizer;
pub mod patterns;
pub mod pdf;
pub mod prompt;
pub mod recognizer;
pub mod retry;
pub mod schema;
pub mod structured;

pub use llm::{CompletionRequest, LanguageModel, LlmError, OpenAiClient, complete_json};
pub use merge::{merge, post_process};
pub use normalizer::{clean_text, normalize_entity, title_case, truncate_chars};
pub use recognizer::{EntityRecognizer, HttpRecognizer, RecognizedSpan};
pub use retry::{RetryPolicy, Transient};
pub use schema::{EntityMap, ExtractionMethod, ExtractionResult, RecognizedEntity};

use std::sync::Arc;

use ingest::Document;
use tracing::{debug, info};

/// Routes a decoded document to the extractor for its format.
#[derive(Clone, Default)]
pub struct Extractor {
    recognizer: Option<Arc<dyn EntityRecognizer>>,
    llm: Option<Arc<dyn LanguageModel>>,
}

impl Extractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_recognizer(mut self, recognizer: Arc<dyn EntityRecognizer>) -> Self {
        self.recognizer = Some(recognizer);
        self
    }

    pub fn with_llm(mut self, llm: Arc<dyn LanguageModel>) -> Self {
        self.llm = Some(llm);
        self
    }

    /// Extract entities from a decoded document.
    ///
    /// Collaborator failures fall back to the rule-based path, so this never
    /// fails once the document decoded.
    pub async fn extract(&self, document: &Document) -> ExtractionResult {
        let file_type = document.file_type();
        debug!(file_type = %file_type, "Routing document");

        let (method, entities, text) = match document {
            Document::Docx(doc) => (
                ExtractionMethod::RuleBased,
                structured::extract_structured(doc),
                document.full_text(),
            ),
            Document::Text(text) => {
                let (method, entities) =
                    chat::extract_free_text(text, self.recognizer.as_deref()).await;
                (method, entities, text.clone())
            }
            Document::Pdf(raw) => {
                let text = clean_text(raw);
                let (method, entities) = pdf::extract_pdf(&text, self.llm.as_deref()).await;
                (method, entities, text)
            }
        };

        info!(
            file_type = %file_type,
            method = %method,
            types = entities.len(),
            total = entities.total_values(),
            "Extraction complete"
        );

        ExtractionResult {
            file_type,
            method,
            entities,
            text,
        }
    }
}
