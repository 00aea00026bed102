//! Vault error types.

use keeper_storage::StorageError;
use thiserror::Error;

/// Vault result type alias.
pub type Result<T> = std::result::Result<T, VaultError>;

/// Failure classification surfaced to callers.
#[derive(Debug, Error)]
pub enum VaultError {
    /// Missing or malformed input, caught before any store is touched.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Update or delete target does not exist.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    #[error("username already exists: {0}")]
    UsernameAlreadyExists(String),

    #[error("user not found: {0}")]
    UserNotFound(String),

    #[error("invalid password")]
    InvalidPassword,

    /// Credential missing, malformed, forged or expired.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// An item with the same id already exists.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Backend failure, with the operation that hit it.
    #[error("{context}: {source}")]
    Storage {
        context: String,
        #[source]
        source: StorageError,
    },

    #[error("password hashing failed: {0}")]
    Hashing(String),

    #[error("token error: {0}")]
    Token(String),
}

impl VaultError {
    /// Wrap a store error with the operation it interrupted.
    ///
    /// Caller mistakes and uniqueness violations keep their own classification.
    pub fn storage(context: impl Into<String>, source: StorageError) -> Self {
        match source {
            StorageError::InvalidInput(msg) => Self::InvalidInput(msg),
            StorageError::InvalidKey(key) => Self::InvalidInput(format!("invalid item id '{key}'")),
            StorageError::Duplicate(key) => Self::Conflict(key),
            source => Self::Storage {
                context: context.into(),
                source,
            },
        }
    }

    /// Stable machine-readable kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "invalid_input",
            Self::RecordNotFound(_) => "record_not_found",
            Self::UsernameAlreadyExists(_) => "username_already_exists",
            Self::UserNotFound(_) => "user_not_found",
            Self::InvalidPassword => "invalid_password",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Conflict(_) => "conflict",
            Self::Storage { .. } | Self::Hashing(_) | Self::Token(_) => "internal",
        }
    }

    /// Whether the error reflects a server-side fault rather than the request.
    pub fn is_internal(&self) -> bool {
        self.kind() == "internal"
    }
}

impl From<StorageError> for VaultError {
    fn from(source: StorageError) -> Self {
        Self::storage("storage", source)
    }
}
