#![forbid(unsafe_code)]

use crate::EncodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[cfg(feature = "sqlite")]
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid input: {0}")]
    InvalidInput(&'static str),
    #[error("document too large (size={size}, limit={limit})")]
    DocumentTooLarge { size: usize, limit: usize },
    #[error("invalid document: {0}")]
    InvalidDocument(#[from] EncodeError),
    #[error("unknown id")]
    UnknownId,
}

impl StoreError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Io(_) => "IO",
            #[cfg(feature = "sqlite")]
            Self::Sql(_) => "SQL",
            Self::Json(_) => "JSON",
            Self::InvalidInput(message) if message.starts_with("RESET_REQUIRED") => "RESET_REQUIRED",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::DocumentTooLarge { .. } => "DOCUMENT_TOO_LARGE",
            Self::InvalidDocument(_) => "INVALID_DOCUMENT",
            Self::UnknownId => "UNKNOWN_ID",
        }
    }
}
