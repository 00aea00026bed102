//! Object store: key-addressed blobs for binary item payloads.
//!
//! Objects live under `{prefix}/{id}` inside a single bucket. Reading a
//! missing object yields `Ok(None)` and deleting one is not an error.

mod fs;
mod memory;

pub use fs::FsObjectStore;
pub use memory::MemoryObjectStore;

use async_trait::async_trait;
use keeper_core::id::is_valid_object_id;
use keeper_core::types::{non_empty, ItemFilter};

use crate::error::{Result, StorageError};

/// Repository of binary payloads.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Create the bucket if it does not exist. Called once at startup.
    async fn ensure_bucket(&self) -> Result<()>;

    /// Store `data` under the key derived from `id`, overwriting any previous
    /// object, and return the locator to persist alongside the item.
    async fn upload_file(&self, id: &str, data: &[u8]) -> Result<String>;

    /// Read the object for the item the filter names.
    async fn get_file(&self, filter: &ItemFilter) -> Result<Option<Vec<u8>>>;

    /// Remove the object for the item the filter names.
    async fn delete_file(&self, filter: &ItemFilter) -> Result<()>;
}

/// Object key for an item id.
pub fn object_key(prefix: &str, id: &str) -> Result<String> {
    if !is_valid_object_id(id) {
        return Err(StorageError::InvalidKey(id.to_string()));
    }
    Ok(format!("{prefix}/{id}"))
}

/// The item id a lookup filter resolves to.
pub(crate) fn filter_id(filter: &ItemFilter) -> Result<&str> {
    non_empty(&filter.id).ok_or_else(|| {
        StorageError::InvalidInput("object lookup requires an item id".to_string())
    })
}

#[cfg(test)]
pub(crate) mod contract {
    //! Behaviour every [`ObjectStore`] implementation must show.

    use super::*;

    pub async fn round_trip(store: &dyn ObjectStore) {
        let bytes = [0xDE, 0xAD, 0xBE, 0xEF];
        let locator = store.upload_file("b1", &bytes).await.unwrap();
        assert!(locator.ends_with("uploads/b1"), "locator {locator}");

        let read = store.get_file(&ItemFilter::by_id("b1")).await.unwrap();
        assert_eq!(read.as_deref(), Some(&bytes[..]));

        // overwrite under the same id
        store.upload_file("b1", b"new").await.unwrap();
        let read = store.get_file(&ItemFilter::by_id("b1")).await.unwrap();
        assert_eq!(read.as_deref(), Some(&b"new"[..]));
    }

    pub async fn missing_and_delete(store: &dyn ObjectStore) {
        assert!(store
            .get_file(&ItemFilter::by_id("nope"))
            .await
            .unwrap()
            .is_none());

        store.upload_file("b1", b"x").await.unwrap();
        store.delete_file(&ItemFilter::by_id("b1")).await.unwrap();
        assert!(store
            .get_file(&ItemFilter::by_id("b1"))
            .await
            .unwrap()
            .is_none());

        // deleting again is not an error
        store.delete_file(&ItemFilter::by_id("b1")).await.unwrap();
    }

    pub async fn rejects_bad_ids(store: &dyn ObjectStore) {
        assert!(matches!(
            store.upload_file("../escape", b"x").await,
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(
            store.get_file(&ItemFilter::default()).await,
            Err(StorageError::InvalidInput(_))
        ));
        assert!(matches!(
            store.delete_file(&ItemFilter::default()).await,
            Err(StorageError::InvalidInput(_))
        ));
    }
}
