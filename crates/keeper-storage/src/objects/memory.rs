//! In-memory object store.

use async_trait::async_trait;
use keeper_core::types::ItemFilter;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::{filter_id, object_key, ObjectStore};
use crate::error::Result;
use crate::faults::Faults;

/// Object store held in process memory, keyed the same way as on disk.
#[derive(Clone)]
pub struct MemoryObjectStore {
    bucket: String,
    prefix: String,
    objects: Arc<RwLock<HashMap<String, Vec<u8>>>>,
    faults: Faults,
}

impl MemoryObjectStore {
    pub fn new(bucket: &str, prefix: &str) -> Self {
        Self {
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
            objects: Arc::new(RwLock::new(HashMap::new())),
            faults: Faults::new(),
        }
    }

    /// Failure injection handle. Operation names: `upload`, `get_file`, `delete_file`.
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    /// Number of stored objects.
    pub async fn len(&self) -> usize {
        self.objects.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.objects.read().await.is_empty()
    }

    /// Raw lookup by item id, bypassing failure injection.
    pub async fn peek(&self, id: &str) -> Option<Vec<u8>> {
        let key = object_key(&self.prefix, id).ok()?;
        self.objects.read().await.get(&key).cloned()
    }
}

impl Default for MemoryObjectStore {
    fn default() -> Self {
        Self::new("secrets", "uploads")
    }
}

#[async_trait]
impl ObjectStore for MemoryObjectStore {
    async fn ensure_bucket(&self) -> Result<()> {
        Ok(())
    }

    async fn upload_file(&self, id: &str, data: &[u8]) -> Result<String> {
        let key = object_key(&self.prefix, id)?;
        self.faults.check("upload").await?;
        self.objects.write().await.insert(key.clone(), data.to_vec());
        Ok(format!("memory://{}/{}", self.bucket, key))
    }

    async fn get_file(&self, filter: &ItemFilter) -> Result<Option<Vec<u8>>> {
        let key = object_key(&self.prefix, filter_id(filter)?)?;
        self.faults.check("get_file").await?;
        Ok(self.objects.read().await.get(&key).cloned())
    }

    async fn delete_file(&self, filter: &ItemFilter) -> Result<()> {
        let key = object_key(&self.prefix, filter_id(filter)?)?;
        self.faults.check("delete_file").await?;
        self.objects.write().await.remove(&key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;

    #[tokio::test]
    async fn test_round_trip() {
        let store = MemoryObjectStore::default();
        contract::round_trip(&store).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_missing_and_delete() {
        contract::missing_and_delete(&MemoryObjectStore::default()).await;
    }

    #[tokio::test]
    async fn test_rejects_bad_ids() {
        contract::rejects_bad_ids(&MemoryObjectStore::default()).await;
    }

    #[tokio::test]
    async fn test_injected_upload_failure() {
        let store = MemoryObjectStore::default();
        store.faults().inject("upload").await;
        assert!(store.upload_file("b1", b"x").await.is_err());
        assert!(store.is_empty().await);
    }
}
