//! Password hashing with Argon2id, stored as PHC strings.

use argon2::password_hash::{self, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use async_trait::async_trait;
use keeper_core::SecretString;

use crate::error::{Result, VaultError};

/// One-way password hashing.
#[async_trait]
pub trait PasswordHashing: Send + Sync {
    /// Hash with a fresh random salt.
    async fn hash(&self, password: &SecretString) -> Result<String>;

    /// Compare a password against a stored hash. `Ok(false)` on mismatch.
    async fn verify(&self, password: &SecretString, hash: &str) -> Result<bool>;
}

/// Argon2id hasher. Hashing runs on the blocking pool.
#[derive(Debug, Clone)]
pub struct Argon2Hasher {
    params: Params,
}

impl Default for Argon2Hasher {
    fn default() -> Self {
        Self {
            params: Params::default(),
        }
    }
}

impl Argon2Hasher {
    /// Hasher with explicit cost parameters (memory in KiB).
    pub fn with_params(memory_kib: u32, iterations: u32, parallelism: u32) -> Result<Self> {
        let params = Params::new(memory_kib, iterations, parallelism, None)
            .map_err(|e| VaultError::Hashing(e.to_string()))?;
        Ok(Self { params })
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}

#[async_trait]
impl PasswordHashing for Argon2Hasher {
    async fn hash(&self, password: &SecretString) -> Result<String> {
        let hasher = self.clone();
        let password = password.clone();
        tokio::task::spawn_blocking(move || {
            let salt_bytes: [u8; 16] = rand::random();
            let salt = SaltString::encode_b64(&salt_bytes)
                .map_err(|e| VaultError::Hashing(e.to_string()))?;
            hasher
                .argon2()
                .hash_password(password.expose_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|e| VaultError::Hashing(e.to_string()))
        })
        .await
        .map_err(|e| VaultError::Hashing(e.to_string()))?
    }

    async fn verify(&self, password: &SecretString, hash: &str) -> Result<bool> {
        let hasher = self.clone();
        let password = password.clone();
        let hash = hash.to_string();
        tokio::task::spawn_blocking(move || {
            let parsed =
                PasswordHash::new(&hash).map_err(|e| VaultError::Hashing(e.to_string()))?;
            match hasher
                .argon2()
                .verify_password(password.expose_bytes(), &parsed)
            {
                Ok(()) => Ok(true),
                Err(password_hash::Error::Password) => Ok(false),
                Err(e) => Err(VaultError::Hashing(e.to_string())),
            }
        })
        .await
        .map_err(|e| VaultError::Hashing(e.to_string()))?
    }
}
