//! # keeper-vault
//!
//! The secret-keeping core of Keeper:
//!
//! - [`DataItemEngine`]: keeps the metadata and object stores in step for every item operation
//! - [`AccessGuard`]: resolves bearer tokens to a caller and scopes every request to its owner
//! - [`AccountService`]: registration and login
//! - [`TokenIssuer`] and [`Argon2Hasher`]: token signing and password hashing

pub mod accounts;
pub mod engine;
pub mod error;
pub mod guard;
pub mod password;
pub mod token;

pub use accounts::AccountService;
pub use engine::DataItemEngine;
pub use error::{Result, VaultError};
pub use guard::AccessGuard;
pub use password::{Argon2Hasher, PasswordHashing};
pub use token::TokenIssuer;

use keeper_core::config::AuthConfig;
use keeper_storage::Backends;
use std::sync::Arc;
use std::time::Duration;

/// Everything a request handler needs, wired over one set of backends.
#[derive(Clone)]
pub struct Vault {
    pub engine: Arc<DataItemEngine>,
    pub guard: Arc<AccessGuard>,
    pub accounts: Arc<AccountService>,
}

impl Vault {
    pub fn new(backends: &Backends, auth: &AuthConfig) -> Self {
        Self::with_hasher(backends, auth, Arc::new(Argon2Hasher::default()))
    }

    pub fn with_hasher(
        backends: &Backends,
        auth: &AuthConfig,
        hasher: Arc<dyn PasswordHashing>,
    ) -> Self {
        let issuer = Arc::new(TokenIssuer::new(
            auth.token_secret.clone(),
            Duration::from_secs(auth.token_ttl_secs),
        ));
        Self {
            engine: Arc::new(DataItemEngine::new(
                backends.metadata.clone(),
                backends.objects.clone(),
            )),
            guard: Arc::new(AccessGuard::new(issuer.clone(), backends.users.clone())),
            accounts: Arc::new(AccountService::new(backends.users.clone(), hasher, issuer)),
        }
    }
}
