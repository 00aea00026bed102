//! Registration and login.

use keeper_core::id;
use keeper_core::types::{NewUserAccount, UserAccount, UserFilter};
use keeper_core::SecretString;
use keeper_storage::UserStore;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, VaultError};
use crate::password::PasswordHashing;
use crate::token::TokenIssuer;

/// User registration and login.
pub struct AccountService {
    users: Arc<dyn UserStore>,
    hasher: Arc<dyn PasswordHashing>,
    issuer: Arc<TokenIssuer>,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserStore>,
        hasher: Arc<dyn PasswordHashing>,
        issuer: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            users,
            hasher,
            issuer,
        }
    }

    /// Create an account with a hashed password.
    pub async fn register(&self, username: &str, password: &SecretString) -> Result<UserAccount> {
        if username.is_empty() || password.is_empty() {
            return Err(VaultError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }

        let by_name = UserFilter::by_username(username);
        let taken = self
            .users
            .exists(&by_name)
            .await
            .map_err(|e| VaultError::storage("check username", e))?;
        if taken {
            return Err(VaultError::UsernameAlreadyExists(username.to_string()));
        }

        let password_hash = self.hasher.hash(password).await?;
        let created = self
            .users
            .create(NewUserAccount {
                user_id: id::uuid(),
                username: username.to_string(),
                password_hash,
            })
            .await;
        match created {
            Ok(_) => {}
            // lost a race with a concurrent registration
            Err(e) if e.is_duplicate() => {
                return Err(VaultError::UsernameAlreadyExists(username.to_string()))
            }
            Err(e) => return Err(VaultError::storage("create user", e)),
        }

        let account = self
            .users
            .get(&by_name)
            .await
            .map_err(|e| VaultError::storage("read user", e))?
            .ok_or_else(|| VaultError::UserNotFound(username.to_string()))?;

        info!(user_id = %account.user_id, "registered user");
        Ok(account)
    }

    /// Check credentials and issue a bearer token bound to the account id.
    pub async fn login(&self, username: &str, password: &SecretString) -> Result<String> {
        if username.is_empty() || password.is_empty() {
            return Err(VaultError::InvalidInput(
                "username and password are required".to_string(),
            ));
        }

        let account = self
            .users
            .get(&UserFilter::by_username(username))
            .await
            .map_err(|e| VaultError::storage("read user", e))?
            .ok_or_else(|| VaultError::UserNotFound(username.to_string()))?;

        if !self.hasher.verify(password, &account.password_hash).await? {
            debug!(user_id = %account.user_id, "password mismatch");
            return Err(VaultError::InvalidPassword);
        }

        let token = self.issuer.issue(&account.user_id)?;
        debug!(user_id = %account.user_id, "issued token");
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::password::Argon2Hasher;
    use keeper_storage::MemoryUserStore;
    use std::time::Duration;

    struct Fixture {
        users: MemoryUserStore,
        issuer: Arc<TokenIssuer>,
        accounts: AccountService,
    }

    fn fixture() -> Fixture {
        let users = MemoryUserStore::new();
        let issuer = Arc::new(TokenIssuer::new(
            SecretString::new("accounts-test-key-0123456789"),
            Duration::from_secs(3600),
        ));
        let accounts = AccountService::new(
            Arc::new(users.clone()),
            Arc::new(Argon2Hasher::with_params(1024, 1, 1).unwrap()),
            issuer.clone(),
        );
        Fixture {
            users,
            issuer,
            accounts,
        }
    }

    fn pw(s: &str) -> SecretString {
        SecretString::new(s)
    }

    #[tokio::test]
    async fn test_register_and_login() {
        let f = fixture();
        let account = f.accounts.register("alice", &pw("pw1")).await.unwrap();
        assert_eq!(account.username, "alice");
        assert!(account.password_hash.starts_with("$argon2id$"));

        let token = f.accounts.login("alice", &pw("pw1")).await.unwrap();
        let identity = f.issuer.verify(&token).unwrap();
        assert_eq!(identity.user_id, account.user_id);
    }

    #[tokio::test]
    async fn test_duplicate_username() {
        let f = fixture();
        f.accounts.register("alice", &pw("pw1")).await.unwrap();
        let err = f.accounts.register("alice", &pw("pw2")).await.unwrap_err();
        assert!(matches!(err, VaultError::UsernameAlreadyExists(ref u) if u == "alice"));
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let f = fixture();
        f.accounts.register("alice", &pw("pw1")).await.unwrap();
        let err = f.accounts.login("alice", &pw("wrongpw")).await.unwrap_err();
        assert!(matches!(err, VaultError::InvalidPassword));
    }

    #[tokio::test]
    async fn test_unknown_user() {
        let f = fixture();
        let err = f.accounts.login("nobody", &pw("pw")).await.unwrap_err();
        assert!(matches!(err, VaultError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_empty_input_rejected_before_store() {
        let f = fixture();
        f.users.faults().inject("get").await;
        f.users.faults().inject("create").await;

        for (u, p) in [("", "pw"), ("alice", ""), ("", "")] {
            assert!(matches!(
                f.accounts.register(u, &pw(p)).await,
                Err(VaultError::InvalidInput(_))
            ));
            assert!(matches!(
                f.accounts.login(u, &pw(p)).await,
                Err(VaultError::InvalidInput(_))
            ));
        }
    }

    #[tokio::test]
    async fn test_password_hash_is_not_plaintext() {
        let f = fixture();
        f.accounts.register("alice", &pw("pw1")).await.unwrap();
        let stored = f
            .users
            .get(&UserFilter::by_username("alice"))
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.password_hash.contains("pw1"));
    }
}
