use thiserror::Error;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Unsupported file type: {0}. Supported: DOCX, TXT, PDF")]
    UnsupportedFormat(String),

    #[error("Corrupt or unreadable document: {0}")]
    CorruptDocument(String),

    #[error("File size {size_mb:.1} MB exceeds maximum limit ({limit_mb} MB)")]
    PayloadTooLarge { size_mb: f64, limit_mb: u64 },
}

pub type Result<T> = std::result::Result<T, DecodeError>;
