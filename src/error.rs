//! Error types for collection_db

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for import, correlation and store operations
#[derive(Debug, Error)]
pub enum CollectionError {
    /// File I/O failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// CSV reader failed on a structural level
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// JSON (de)serialization failed
    #[error("Parse error: {0}")]
    Json(#[from] serde_json::Error),
    /// A required column is absent from an import file header
    #[error("{file}: missing required column '{column}'")]
    MissingColumn { file: String, column: String },
    /// A data row failed validation
    #[error("{file}, row {row}: {reason}")]
    MalformedRow {
        file: String,
        row: usize,
        reason: String,
    },
    /// A card object has no type line on the card or its first face
    #[error("Card has no type line: {card}")]
    MissingTypeLine { card: String },
    /// Artifact header is missing or inconsistent
    #[error("Invalid card database {path}: {reason}")]
    InvalidMetadata { path: PathBuf, reason: String },
    /// A filter value could not be parsed
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),
    /// A user-supplied pattern failed to compile
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Result alias for collection_db operations
pub type Result<T> = std::result::Result<T, CollectionError>;
