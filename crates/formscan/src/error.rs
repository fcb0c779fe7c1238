use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FormscanError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Extraction error: {0}")]
    Extract(#[from] ExtractError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),
}

/// Errors from the extraction pipeline and its providers.
#[derive(Error, Debug)]
pub enum ExtractError {
    /// The declared media type is not an image. Raised before any network
    /// or database work happens for the file.
    #[error("Invalid file type. Only images are allowed.")]
    InvalidFileType,

    /// A required credential is missing. For vision providers this is a
    /// silent skip; for the OCR fallback it is the terminal error.
    #[error("{0}")]
    NotConfigured(String),

    #[error("{provider} extraction failed: {message}")]
    Provider {
        provider: &'static str,
        message: String,
    },

    #[error("No valid JSON found in {provider} response")]
    NoJsonFound { provider: &'static str },

    #[error("OCR processing failed: {0}")]
    OcrFailed(String),
}

pub type Result<T> = std::result::Result<T, FormscanError>;
