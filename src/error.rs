use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for the transformer.
///
/// Nothing here is caught or retried locally: every variant propagates to
/// the invocation boundary, is logged once, and fails the invocation.
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Transfer failed for key '{key}': {message}")]
    Transfer { key: String, message: String },

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("No user table found in {}", path.display())]
    NoTable { path: PathBuf },

    #[error("Expected exactly one table in {}, found {}: {names:?}", path.display(), names.len())]
    MultipleTables { path: PathBuf, names: Vec<String> },

    #[error("No 'Timestamp' column in table '{table}' of {}", path.display())]
    MissingTimestamp { path: PathBuf, table: String },

    #[error("Unparseable timestamp value '{value}' in row {row}")]
    BadTimestamp { value: String, row: usize },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, TransformError>;
