use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileType {
    Docx,
    Txt,
    Pdf,
}

impl FileType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Docx => "docx",
            Self::Txt => "txt",
            Self::Pdf => "pdf",
        }
    }

    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "docx" => Some(Self::Docx),
            "txt" => Some(Self::Txt),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A table as rows of cell texts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub rows: Vec<Vec<String>>,
}

/// Paragraphs and tables of a word-processing document, in body order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StructuredDocument {
    pub paragraphs: Vec<String>,
    pub tables: Vec<Table>,
}

impl StructuredDocument {
    /// Non-blank paragraphs joined by newlines.
    pub fn paragraph_text(&self) -> String {
        self.paragraphs
            .iter()
            .filter(|p| !p.trim().is_empty())
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// A decoded upload, tagged by the path it takes through extraction.
#[derive(Debug, Clone, PartialEq)]
pub enum Document {
    Docx(StructuredDocument),
    Text(String),
    Pdf(String),
}

impl Document {
    pub fn file_type(&self) -> FileType {
        match self {
            Self::Docx(_) => FileType::Docx,
            Self::Text(_) => FileType::Txt,
            Self::Pdf(_) => FileType::Pdf,
        }
    }

    /// Full text used for classification, summaries and Q&A.
    pub fn full_text(&self) -> String {
        match self {
            Self::Docx(doc) => doc.paragraphs.join("\n"),
            Self::Text(text) | Self::Pdf(text) => text.clone(),
        }
    }
}
