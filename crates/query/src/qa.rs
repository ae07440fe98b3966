use std::collections::HashSet;
use std::sync::Arc;

use extract::{CompletionRequest, EntityMap, LanguageModel, title_case, truncate_chars};
use serde::{Deserialize, Serialize};
use tracing::{error, info};

const QA_CONTEXT_CHARS: usize = 4000;
const MAX_SOURCES: usize = 3;
const MAX_SUGGESTIONS: usize = 5;
const MIN_SENTENCE_CHARS: usize = 10;
const MIN_SHARED_WORDS: usize = 2;

const QA_SYSTEM: &str = "You are a financial document analyst. Answer questions accurately \
    based only on the provided document context. If information is not in the document, \
    say so clearly.";

/// Entity type to the question it suggests, in suggestion order.
const ENTITY_QUESTIONS: &[(&str, &str)] = &[
    ("counterparty", "Who are the counterparties?"),
    ("notional", "What is the notional amount?"),
    ("maturity", "What is the maturity date?"),
    ("coupon", "What is the coupon rate?"),
    ("isin", "What is the ISIN?"),
];

const DEFAULT_QUESTIONS: &[&str] = &[
    "What is this document about?",
    "Who are the parties involved?",
    "What are the key terms?",
    "What are the important dates?",
    "What are the financial amounts?",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exchange {
    pub question: String,
    pub answer: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaAnswer {
    pub answer: String,
    pub sources: Vec<String>,
    /// History length after this exchange was stored.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl QaAnswer {
    fn failed(answer: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            answer: answer.into(),
            sources: Vec::new(),
            conversation_id: None,
            error: Some(error.into()),
        }
    }
}

/// Question answering over one document and its extracted entities.
pub struct DocumentQa {
    llm: Option<Arc<dyn LanguageModel>>,
    document_text: String,
    entities: EntityMap,
    history: Vec<Exchange>,
}

impl DocumentQa {
    pub fn new(
        llm: Option<Arc<dyn LanguageModel>>,
        document_text: impl Into<String>,
        entities: EntityMap,
    ) -> Self {
        Self {
            llm,
            document_text: document_text.into(),
            entities,
            history: Vec::new(),
        }
    }

    pub async fn ask(&mut self, question: &str) -> QaAnswer {
        let Some(llm) = self.llm.clone() else {
            return QaAnswer::failed(
                "Q&A requires an OpenAI API key. Please configure OPENAI_API_KEY.",
                "OpenAI not configured",
            );
        };

        if self.document_text.is_empty() {
            return QaAnswer::failed(
                "No document context available. Please upload a document first.",
                "No context",
            );
        }

        let context = truncate_chars(&self.document_text, QA_CONTEXT_CHARS);
        let prompt = format!(
            "Document Context:\n{}\n\n{}\n\nQuestion: {}\n\nAnswer based only on the document above.",
            context,
            self.entity_context(),
            question
        );
        let request = CompletionRequest::new(QA_SYSTEM, prompt)
            .temperature(0.3)
            .max_tokens(300);

        match llm.complete(&request).await {
            Ok(answer) => {
                let answer = answer.trim().to_string();
                let sources = relevant_sections(question, context);
                self.history.push(Exchange {
                    question: question.to_string(),
                    answer: answer.clone(),
                });
                info!(exchanges = self.history.len(), "Answered question");

                QaAnswer {
                    answer,
                    sources,
                    conversation_id: Some(self.history.len()),
                    error: None,
                }
            }
            Err(e) => {
                error!(error = %e, "Q&A request failed");
                let cause = format!("{:#}", e);
                QaAnswer::failed(format!("Error processing question: {}", cause), cause)
            }
        }
    }

    /// Answer each question in turn; later questions see earlier exchanges in history.
    pub async fn ask_multiple(&mut self, questions: &[String]) -> Vec<QaAnswer> {
        let mut answers = Vec::with_capacity(questions.len());
        for question in questions {
            answers.push(self.ask(question).await);
        }
        answers
    }

    pub fn suggested_questions(&self) -> Vec<String> {
        if self.document_text.is_empty() {
            return Vec::new();
        }

        let mut suggestions: Vec<String> = ENTITY_QUESTIONS
            .iter()
            .filter(|(entity_type, _)| self.entities.has(entity_type))
            .map(|(_, question)| question.to_string())
            .collect();

        if suggestions.is_empty() {
            suggestions = DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect();
        }

        suggestions.truncate(MAX_SUGGESTIONS);
        suggestions
    }

    pub fn history(&self) -> &[Exchange] {
        &self.history
    }

    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// "Extracted Information:" block, empty when there is nothing to show.
    fn entity_context(&self) -> String {
        let lines: Vec<String> = self
            .entities
            .iter()
            .filter(|(_, values)| !values.is_empty())
            .map(|(entity_type, values)| {
                format!("- {}: {}", title_case(entity_type), values.join(", "))
            })
            .collect();

        if lines.is_empty() {
            String::new()
        } else {
            format!("Extracted Information:\n{}", lines.join("\n"))
        }
    }
}

/// Up to three sentences sharing at least two words with the question.
pub fn relevant_sections(question: &str, context: &str) -> Vec<String> {
    let question_words: HashSet<String> =
        question.split_whitespace().map(str::to_lowercase).collect();

    context
        .split('.')
        .map(str::trim)
        .filter(|sentence| sentence.chars().count() >= MIN_SENTENCE_CHARS)
        .filter(|sentence| {
            let words: HashSet<String> =
                sentence.split_whitespace().map(str::to_lowercase).collect();
            words.intersection(&question_words).count() >= MIN_SHARED_WORDS
        })
        .take(MAX_SOURCES)
        .map(|sentence| format!("{}.", sentence))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tests::ScriptedModel;

    const DOC: &str = "The notional amount is EUR 10 million. The maturity date is 15 June 2027. \
        Short. The coupon rate is five percent per annum.";

    fn entities() -> EntityMap {
        let mut entities = EntityMap::new();
        entities.push("coupon", "4.5%");
        entities.push("counterparty", "Societe Generale");
        entities
    }

    #[test]
    fn test_relevant_sections() {
        let sources = relevant_sections("What is the maturity date?", DOC);
        assert_eq!(
            sources,
            vec![
                "The notional amount is EUR 10 million.",
                "The maturity date is 15 June 2027.",
                "The coupon rate is five percent per annum.",
            ]
        );

        assert!(relevant_sections("notional", DOC).is_empty());
    }

    #[test]
    fn test_suggestions() {
        let qa = DocumentQa::new(None, DOC, entities());
        assert_eq!(
            qa.suggested_questions(),
            vec!["Who are the counterparties?", "What is the coupon rate?"]
        );

        let qa = DocumentQa::new(None, DOC, EntityMap::new());
        assert_eq!(qa.suggested_questions().len(), 5);
        assert_eq!(qa.suggested_questions()[0], "What is this document about?");

        let qa = DocumentQa::new(None, "", entities());
        assert!(qa.suggested_questions().is_empty());
    }

    #[tokio::test]
    async fn test_ask_without_llm_or_context() {
        let mut qa = DocumentQa::new(None, DOC, EntityMap::new());
        let answer = qa.ask("What is the coupon?").await;
        assert_eq!(answer.error.as_deref(), Some("OpenAI not configured"));

        let model: Arc<dyn LanguageModel> = Arc::new(ScriptedModel::new(vec![]));
        let mut qa = DocumentQa::new(Some(model), "", EntityMap::new());
        let answer = qa.ask("What is the coupon?").await;
        assert_eq!(answer.error.as_deref(), Some("No context"));
        assert!(qa.history().is_empty());
    }

    #[tokio::test]
    async fn test_conversation_history() {
        let model = Arc::new(ScriptedModel::new(vec![
            Ok(" 4.5% per annum. "),
            Err("upstream 500"),
            Ok("EUR 10 million."),
        ]));
        let mut qa = DocumentQa::new(Some(model.clone()), DOC, entities());

        let answers = qa
            .ask_multiple(&[
                "What is the coupon rate?".to_string(),
                "Who is the issuer?".to_string(),
                "What is the notional amount?".to_string(),
            ])
            .await;

        assert_eq!(answers[0].answer, "4.5% per annum.");
        assert_eq!(answers[0].conversation_id, Some(1));
        assert!(
            answers[0]
                .sources
                .contains(&"The coupon rate is five percent per annum.".to_string())
        );
        assert!(answers[1].answer.starts_with("Error processing question: upstream 500"));
        assert_eq!(answers[1].error.as_deref(), Some("upstream 500"));
        assert_eq!(answers[2].conversation_id, Some(2));
        assert_eq!(qa.history().len(), 2);

        let prompt = &model.prompts()[0];
        assert!(prompt.contains("Extracted Information:\n- Coupon: 4.5%\n- Counterparty: Societe Generale"));
        assert!(prompt.contains("Question: What is the coupon rate?"));

        qa.clear_history();
        assert!(qa.history().is_empty());
    }
}
