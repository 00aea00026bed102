//! Storage error types.

use thiserror::Error;

/// Storage result type alias.
pub type Result<T> = std::result::Result<T, StorageError>;

/// Errors raised by the metadata, object and user stores.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Missing or empty filter, or another caller mistake caught before any I/O.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Uniqueness violation on insert.
    #[error("Duplicate record: {0}")]
    Duplicate(String),

    /// Item id cannot be turned into an object key.
    #[error("Invalid object key: {0}")]
    InvalidKey(String),

    /// Relational backend failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A stored value could not be decoded.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Backend configuration could not be resolved.
    #[error("Configuration error: {0}")]
    Config(#[from] keeper_core::ConfigError),
}

impl StorageError {
    /// Classify an insert failure, turning unique-constraint hits into [`StorageError::Duplicate`].
    pub fn from_insert(err: sqlx::Error, key: &str) -> Self {
        if let sqlx::Error::Database(db) = &err {
            if db.is_unique_violation() {
                return Self::Duplicate(key.to_string());
            }
        }
        Self::Database(err)
    }

    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate(_))
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_) | Self::InvalidKey(_))
    }
}
