//! Gateway error types.

use crate::rpc::JsonRpcError;
use keeper_vault::VaultError;
use thiserror::Error;
use tracing::error;

/// Errors that can occur in the gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Method not found.
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Invalid parameters.
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    /// No caller identity for a method that needs one.
    #[error("Authentication error: {0}")]
    Auth(String),

    /// The request ran past its deadline.
    #[error("Request timed out after {0}s")]
    Timeout(u64),

    /// Failure reported by the vault.
    #[error(transparent)]
    Vault(#[from] VaultError),

    /// Internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Get the JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::Json(_) => -32700,
            Self::Auth(_) => -32001,
            Self::Timeout(_) => -32008,
            Self::Vault(err) => match err {
                VaultError::InvalidInput(_) => -32602,
                VaultError::Unauthenticated(_) => -32001,
                VaultError::RecordNotFound(_) => -32002,
                VaultError::UsernameAlreadyExists(_) => -32003,
                VaultError::UserNotFound(_) => -32004,
                VaultError::InvalidPassword => -32005,
                VaultError::Conflict(_) => -32006,
                _ => -32603,
            },
            Self::Io(_) | Self::Internal(_) => -32603,
        }
    }

    /// Stable machine-readable classification.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::MethodNotFound(_) => "method_not_found",
            Self::InvalidParams(_) => "invalid_input",
            Self::Json(_) => "parse_error",
            Self::Auth(_) => "unauthenticated",
            Self::Timeout(_) => "timeout",
            Self::Vault(err) => err.kind(),
            Self::Io(_) | Self::Internal(_) => "internal",
        }
    }

    pub fn is_internal(&self) -> bool {
        self.kind() == "internal"
    }

    /// Convert into a wire error.
    ///
    /// Internal failures are logged in full here and reach the caller only
    /// as `internal error`.
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let message = if self.is_internal() {
            error!(error = %self, "internal failure");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        JsonRpcError::new(self.code(), message)
            .with_data(serde_json::json!({ "kind": self.kind() }))
    }
}
