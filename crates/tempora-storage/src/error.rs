//! Storage error types for tempora-storage.
//!
//! [`StorageError`] covers all anticipated failure modes in the storage layer:
//! serialization, SQLite access, schema migration, timestamp decoding, and
//! integrity violations between the live graph and the stores.

use thiserror::Error;

/// Errors produced by storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// JSON serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The SQLite driver reported an error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Applying schema migrations failed.
    #[error("migration error: {0}")]
    Migration(String),

    /// A stored timestamp could not be parsed.
    #[error("timestamp error: {0}")]
    Timestamp(#[from] chrono::ParseError),

    /// A data integrity violation was detected.
    #[error("integrity error: {reason}")]
    IntegrityError { reason: String },
}
