use lopdf::Document;
use tracing::{debug, warn};

use crate::error::{DecodeError, Result};

/// Extract page text from a PDF, pages joined by newlines.
///
/// Pages whose content streams cannot be decoded are skipped; a document
/// that yields no text at all is treated as unreadable.
pub fn decode_pdf(bytes: &[u8]) -> Result<String> {
    let doc = Document::load_mem(bytes)
        .map_err(|e| DecodeError::CorruptDocument(format!("failed to load PDF: {}", e)))?;

    if doc.is_encrypted() {
        return Err(DecodeError::CorruptDocument(
            "PDF is encrypted and could not be decrypted".to_string(),
        ));
    }

    let pages = doc.get_pages();
    debug!(pages = pages.len(), "Decoding PDF");

    let mut parts = Vec::with_capacity(pages.len());
    for page_number in pages.keys() {
        match doc.extract_text(&[*page_number]) {
            Ok(text) if !text.trim().is_empty() => parts.push(text),
            Ok(_) => {}
            Err(e) => warn!(page = page_number, error = %e, "Skipping unreadable PDF page"),
        }
    }

    if parts.is_empty() {
        return Err(DecodeError::CorruptDocument(
            "could not extract text from PDF".to_string(),
        ));
    }

    Ok(parts.join("\n"))
}
