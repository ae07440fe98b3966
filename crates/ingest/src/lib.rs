pub mod document;
pub mod docx;
pub mod error;
pub mod format;
pub mod pdf;
pub mod reader;

pub use document::{Document, FileType, StructuredDocument, Table};
pub use error::{DecodeError, Result};
pub use format::{DEFAULT_MAX_FILE_SIZE_MB, detect_file_type, validate_file_size};
pub use reader::{FileReader, decode_text};
