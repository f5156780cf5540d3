//! Error types for the intent chatbot

use thiserror::Error;

/// Result type alias for chatbot operations
pub type Result<T> = std::result::Result<T, ChatbotError>;

#[derive(Error, Debug)]
pub enum ChatbotError {

    // =============================
    // Start-up Errors (fatal)
    // =============================

    #[error("Load error: {0}")]
    LoadError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    // =============================
    // Per-call Errors
    // =============================

    #[error("Classification error: {0}")]
    ClassificationError(String),

    #[error("Log write error: {0}")]
    LogWriteError(String),

    // =============================
    // External Library Conversions
    // =============================

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}
