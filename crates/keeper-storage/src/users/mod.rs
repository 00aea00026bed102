//! User account store.

mod memory;
mod sqlite;

pub use memory::MemoryUserStore;
pub use sqlite::SqliteUserStore;

use async_trait::async_trait;
use keeper_core::types::{NewUserAccount, UserAccount, UserFilter, UserListFilter, UserPatch};

use crate::error::{Result, StorageError};

/// Repository of user accounts. Usernames are unique.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn get(&self, filter: &UserFilter) -> Result<Option<UserAccount>>;

    async fn list(&self, filter: &UserListFilter) -> Result<Vec<UserAccount>>;

    /// Insert an account. A taken id or username fails with [`StorageError::Duplicate`].
    async fn create(&self, user: NewUserAccount) -> Result<UserAccount>;

    async fn update(&self, filter: &UserFilter, patch: &UserPatch) -> Result<u64>;

    async fn delete(&self, filter: &UserFilter) -> Result<u64>;

    async fn exists(&self, filter: &UserFilter) -> Result<bool> {
        Ok(self.get(filter).await?.is_some())
    }
}

pub(crate) fn require_valid(filter: &UserFilter) -> Result<()> {
    if filter.is_valid() {
        Ok(())
    } else {
        Err(StorageError::InvalidInput(
            "user filter must set user_id or username".to_string(),
        ))
    }
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every [`UserStore`] implementation must show.

    use super::*;

    fn new_user(id: &str, name: &str) -> NewUserAccount {
        NewUserAccount {
            user_id: id.to_string(),
            username: name.to_string(),
            password_hash: format!("hash-of-{name}"),
        }
    }

    pub async fn create_get_exists(store: &dyn UserStore) {
        let created = store.create(new_user("u1", "alice")).await.unwrap();
        assert_eq!(created.username, "alice");

        let by_name = store
            .get(&UserFilter::by_username("alice"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.user_id, "u1");
        assert_eq!(by_name.password_hash, "hash-of-alice");

        assert!(store.exists(&UserFilter::by_id("u1")).await.unwrap());
        assert!(!store.exists(&UserFilter::by_username("bob")).await.unwrap());
    }

    pub async fn unique_username(store: &dyn UserStore) {
        store.create(new_user("u1", "alice")).await.unwrap();
        let err = store.create(new_user("u2", "alice")).await.unwrap_err();
        assert!(err.is_duplicate(), "unexpected error: {err}");
    }

    pub async fn list_update_delete(store: &dyn UserStore) {
        store.create(new_user("u1", "alice")).await.unwrap();
        store.create(new_user("u2", "bob")).await.unwrap();

        let all = store.list(&UserListFilter::default()).await.unwrap();
        assert_eq!(all.len(), 2);

        let some = store
            .list(&UserListFilter {
                user_ids: Some(vec!["u2".to_string()]),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(some.len(), 1);
        assert_eq!(some[0].username, "bob");

        let changed = store
            .update(
                &UserFilter::by_id("u2"),
                &UserPatch {
                    username: None,
                    password_hash: Some("rotated".to_string()),
                },
            )
            .await
            .unwrap();
        assert_eq!(changed, 1);
        let bob = store.get(&UserFilter::by_id("u2")).await.unwrap().unwrap();
        assert_eq!(bob.password_hash, "rotated");

        assert_eq!(store.delete(&UserFilter::by_id("u2")).await.unwrap(), 1);
        assert!(!store.exists(&UserFilter::by_id("u2")).await.unwrap());
    }

    pub async fn empty_filter_rejected(store: &dyn UserStore) {
        let empty = UserFilter::default();
        assert!(store.get(&empty).await.unwrap_err().is_invalid_input());
        assert!(store
            .update(&empty, &UserPatch::default())
            .await
            .unwrap_err()
            .is_invalid_input());
        assert!(store.delete(&empty).await.unwrap_err().is_invalid_input());
    }
}
