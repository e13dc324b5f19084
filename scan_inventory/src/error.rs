//! Error types for scan_inventory

use crate::entry::EntryError;
use thiserror::Error;

/// Unified error type for scan_inventory operations
#[derive(Debug, Error)]
pub enum InventoryError {
    /// SQLite operation failed (I/O, corruption, constraint, ...)
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    /// File system operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Writing the export file failed
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    /// Serializing output failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    /// User-entered product fields were rejected
    #[error("Invalid entry: {0}")]
    Entry(#[from] EntryError),
    /// A blocking store task panicked or was cancelled
    #[error("Store worker failed: {0}")]
    Worker(String),
}

impl From<tokio::task::JoinError> for InventoryError {
    fn from(err: tokio::task::JoinError) -> Self {
        InventoryError::Worker(err.to_string())
    }
}

/// Result alias for scan_inventory operations
pub type Result<T> = std::result::Result<T, InventoryError>;
