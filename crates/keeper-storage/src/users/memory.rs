//! In-memory user store.

use async_trait::async_trait;
use keeper_core::types::{NewUserAccount, UserAccount, UserFilter, UserListFilter, UserPatch};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{require_valid, UserStore};
use crate::error::{Result, StorageError};
use crate::faults::Faults;
use crate::now;

/// User store held in process memory, keyed by user id.
#[derive(Clone, Default)]
pub struct MemoryUserStore {
    users: Arc<RwLock<BTreeMap<String, UserAccount>>>,
    faults: Faults,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection handle. Operation names: `get`, `create`.
    pub fn faults(&self) -> &Faults {
        &self.faults
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn get(&self, filter: &UserFilter) -> Result<Option<UserAccount>> {
        require_valid(filter)?;
        self.faults.check("get").await?;
        let users = self.users.read().await;
        Ok(users.values().find(|u| filter.matches(u)).cloned())
    }

    async fn list(&self, filter: &UserListFilter) -> Result<Vec<UserAccount>> {
        let users = self.users.read().await;
        let mut found: Vec<UserAccount> =
            users.values().filter(|u| filter.matches(u)).cloned().collect();
        found.sort_by(|a, b| (a.created_at, &a.user_id).cmp(&(b.created_at, &b.user_id)));
        Ok(found)
    }

    async fn create(&self, user: NewUserAccount) -> Result<UserAccount> {
        self.faults.check("create").await?;
        let mut users = self.users.write().await;
        if users.contains_key(&user.user_id)
            || users.values().any(|u| u.username == user.username)
        {
            return Err(StorageError::Duplicate(user.username));
        }
        let row = user.into_row(now());
        users.insert(row.user_id.clone(), row.clone());
        Ok(row)
    }

    async fn update(&self, filter: &UserFilter, patch: &UserPatch) -> Result<u64> {
        require_valid(filter)?;
        if patch.is_empty() {
            return Ok(0);
        }
        let mut users = self.users.write().await;
        if let Some(name) = &patch.username {
            if users
                .values()
                .any(|u| &u.username == name && !filter.matches(u))
            {
                return Err(StorageError::Duplicate(name.clone()));
            }
        }
        let at = now();
        let mut changed = 0;
        for user in users.values_mut().filter(|u| filter.matches(u)) {
            patch.apply(user, at);
            changed += 1;
        }
        Ok(changed)
    }

    async fn delete(&self, filter: &UserFilter) -> Result<u64> {
        require_valid(filter)?;
        let mut users = self.users.write().await;
        let before = users.len();
        users.retain(|_, u| !filter.matches(u));
        Ok((before - users.len()) as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;

    #[tokio::test]
    async fn test_create_get_exists() {
        contract::create_get_exists(&MemoryUserStore::new()).await;
    }

    #[tokio::test]
    async fn test_unique_username() {
        contract::unique_username(&MemoryUserStore::new()).await;
    }

    #[tokio::test]
    async fn test_list_update_delete() {
        contract::list_update_delete(&MemoryUserStore::new()).await;
    }

    #[tokio::test]
    async fn test_empty_filter_rejected() {
        contract::empty_filter_rejected(&MemoryUserStore::new()).await;
    }
}
