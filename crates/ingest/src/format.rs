use std::path::Path;

use crate::document::FileType;
use crate::error::{DecodeError, Result};

pub const DEFAULT_MAX_FILE_SIZE_MB: u64 = 50;

const DOCX_MAIN_PART: &[u8] = b"word/document.xml";

/// Detect file type from the filename extension, falling back to magic bytes.
pub fn detect_file_type(content: &[u8], filename: &str) -> Result<FileType> {
    let extension = Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("");

    if let Some(file_type) = FileType::from_extension(extension) {
        return Ok(file_type);
    }

    match content {
        // %PDF
        [0x25, 0x50, 0x44, 0x46, ..] => Ok(FileType::Pdf),
        // PK\x03\x04: a zip container, only accepted when it carries a Word body part
        [0x50, 0x4B, 0x03, 0x04, ..] if contains(content, DOCX_MAIN_PART) => Ok(FileType::Docx),
        _ if !content.is_empty() && std::str::from_utf8(content).is_ok() => Ok(FileType::Txt),
        _ => Err(DecodeError::UnsupportedFormat(if extension.is_empty() {
            "unknown".to_string()
        } else {
            extension.to_string()
        })),
    }
}

/// Reject uploads larger than `max_size_mb` megabytes.
pub fn validate_file_size(content: &[u8], max_size_mb: u64) -> Result<()> {
    let size_mb = content.len() as f64 / (1024.0 * 1024.0);
    if size_mb > max_size_mb as f64 {
        return Err(DecodeError::PayloadTooLarge {
            size_mb,
            limit_mb: max_size_mb,
        });
    }
    Ok(())
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_wins() {
        assert_eq!(detect_file_type(b"hello", "trade.PDF").unwrap(), FileType::Pdf);
        assert_eq!(detect_file_type(b"", "notes.txt").unwrap(), FileType::Txt);
        assert_eq!(detect_file_type(b"", "terms.docx").unwrap(), FileType::Docx);
    }

    #[test]
    fn test_magic_bytes_fallback() {
        assert_eq!(detect_file_type(b"%PDF-1.7\n", "upload").unwrap(), FileType::Pdf);
        assert_eq!(
            detect_file_type(b"[09:15] trader: 200 mio estr+45bps", "chat").unwrap(),
            FileType::Txt
        );

        let mut zip_bytes = vec![0x50, 0x4B, 0x03, 0x04];
        zip_bytes.extend_from_slice(b"....word/document.xml....");
        assert_eq!(detect_file_type(&zip_bytes, "upload.bin").unwrap(), FileType::Docx);
    }

    #[test]
    fn test_unknown_format_is_rejected() {
        let err = detect_file_type(&[0xFF, 0xD8, 0xFF, 0xE0], "scan.jpg").unwrap_err();
        assert!(matches!(err, DecodeError::UnsupportedFormat(ext) if ext == "jpg"));
    }

    #[test]
    fn test_size_limit() {
        let content = vec![0u8; 2 * 1024 * 1024];
        assert!(validate_file_size(&content, 2).is_ok());
        assert!(matches!(
            validate_file_size(&content, 1),
            Err(DecodeError::PayloadTooLarge { limit_mb: 1, .. })
        ));
    }
}
