use thiserror::Error;

use crate::Version;

/// Errors that can occur when interacting with the context store.
#[derive(Debug, Error)]
pub enum ContextStoreError {
    /// Another writer changed the context since it was read.
    #[error("Concurrency conflict for key {key}: expected version {expected}, found {actual}")]
    ConcurrencyConflict {
        key: String,
        expected: Version,
        actual: Version,
    },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for context store operations.
pub type Result<T> = std::result::Result<T, ContextStoreError>;
