//! Error types for the moderation store

use thiserror::Error;

/// Errors that can occur while reading or writing moderation state
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// Could not create the database file's directory
    #[error("failed to prepare database directory: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;
