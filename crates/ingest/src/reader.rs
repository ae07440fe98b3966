use tracing::debug;

use crate::docx::decode_docx;
use crate::document::{Document, FileType};
use crate::error::Result;
use crate::format::{detect_file_type, validate_file_size};
use crate::pdf::decode_pdf;

pub struct FileReader {
    max_file_size_mb: u64,
}

impl FileReader {
    pub fn new(max_file_size_mb: u64) -> Self {
        Self { max_file_size_mb }
    }

    /// Validate, detect and decode an uploaded file.
    pub fn read(&self, content: &[u8], filename: &str) -> Result<Document> {
        validate_file_size(content, self.max_file_size_mb)?;

        let file_type = detect_file_type(content, filename)?;
        debug!(filename, %file_type, bytes = content.len(), "Decoding upload");

        let document = match file_type {
            FileType::Docx => Document::Docx(decode_docx(content)?),
            FileType::Txt => Document::Text(decode_text(content)),
            FileType::Pdf => Document::Pdf(decode_pdf(content)?),
        };

        Ok(document)
    }
}

impl Default for FileReader {
    fn default() -> Self {
        Self::new(crate::format::DEFAULT_MAX_FILE_SIZE_MB)
    }
}

/// Decode text bytes as UTF-8, falling back to Latin-1.
pub fn decode_text(content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(text) => text.to_string(),
        Err(_) => content.iter().map(|&b| b as char).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DecodeError;

    #[test]
    fn test_read_text() {
        let doc = FileReader::default()
            .read(b"GS to pay 200 mio", "chat.txt")
            .unwrap();
        assert_eq!(doc, Document::Text("GS to pay 200 mio".to_string()));
        assert_eq!(doc.file_type(), FileType::Txt);
    }

    #[test]
    fn test_latin1_fallback() {
        assert_eq!(decode_text(&[0x4E, 0x6F, 0x74, 0x65, 0xA3, 0x35]), "Note£5");
    }

    #[test]
    fn test_read_docx() {
        let bytes = crate::docx::tests::build_docx(
            "<w:p><w:r><w:t>Counterparty: Goldman Sachs</w:t></w:r></w:p>",
        );
        let doc = FileReader::default().read(&bytes, "terms.docx").unwrap();
        match doc {
            Document::Docx(structured) => {
                assert_eq!(structured.paragraph_text(), "Counterparty: Goldman Sachs")
            }
            other => panic!("expected docx, got {:?}", other),
        }
    }

    #[test]
    fn test_size_checked_before_decoding() {
        let reader = FileReader::new(0);
        let err = reader.read(b"not empty", "notes.txt").unwrap_err();
        assert!(matches!(err, DecodeError::PayloadTooLarge { .. }));
    }
}
