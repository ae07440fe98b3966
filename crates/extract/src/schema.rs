use indexmap::IndexMap;
use ingest::FileType;
use serde::{Deserialize, Serialize};

/// Entity type tag to ordered values, types kept in first-inserted order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityMap(IndexMap<String, Vec<String>>);

impl EntityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one value under `entity_type`, creating the type if needed.
    pub fn push(&mut self, entity_type: &str, value: impl Into<String>) {
        self.0
            .entry(entity_type.to_string())
            .or_default()
            .push(value.into());
    }

    /// Append every value of `values` under `entity_type`. An empty iterator
    /// leaves the map untouched.
    pub fn extend<I, S>(&mut self, entity_type: &str, values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut values = values.into_iter().map(Into::into).peekable();
        if values.peek().is_some() {
            self.0
                .entry(entity_type.to_string())
                .or_default()
                .extend(values);
        }
    }

    pub fn get(&self, entity_type: &str) -> Option<&[String]> {
        self.0.get(entity_type).map(Vec::as_slice)
    }

    /// True when `entity_type` is present with at least one value.
    pub fn has(&self, entity_type: &str) -> bool {
        self.get(entity_type).is_some_and(|v| !v.is_empty())
    }

    pub fn count(&self, entity_type: &str) -> usize {
        self.get(entity_type).map_or(0, <[String]>::len)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of entity types.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn total_values(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}

impl FromIterator<(String, Vec<String>)> for EntityMap {
    fn from_iter<T: IntoIterator<Item = (String, Vec<String>)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ExtractionMethod {
    RuleBased,
    NerModel,
    LlmExtraction,
}

impl ExtractionMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RuleBased => "rule-based",
            Self::NerModel => "ner-model",
            Self::LlmExtraction => "llm-extraction",
        }
    }
}

impl std::fmt::Display for ExtractionMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub file_type: FileType,
    pub method: ExtractionMethod,
    pub entities: EntityMap,
    /// Document text the entities were extracted from.
    pub text: String,
}

/// A recognizer span with its derived confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecognizedEntity {
    pub text: String,
    pub label: String,
    pub start: usize,
    pub end: usize,
    pub confidence: f64,
}
