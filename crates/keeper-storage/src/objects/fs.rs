//! Filesystem object store: one directory per bucket.

use async_trait::async_trait;
use keeper_core::id::{is_valid_object_id, short_id};
use keeper_core::types::ItemFilter;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{filter_id, object_key, ObjectStore};
use crate::error::{Result, StorageError};

/// Object store rooted at `{root}/{bucket}`.
///
/// Writes go to a temporary file that is renamed into place, so readers never
/// observe a partially written object. Files are created with mode `0600` on Unix.
pub struct FsObjectStore {
    bucket_dir: PathBuf,
    bucket: String,
    prefix: String,
}

impl FsObjectStore {
    /// Create a store without touching the filesystem.
    pub fn new(root: impl Into<PathBuf>, bucket: &str, prefix: &str) -> Result<Self> {
        if !is_valid_object_id(bucket) {
            return Err(StorageError::InvalidKey(format!("bucket '{bucket}'")));
        }
        Ok(Self {
            bucket_dir: root.into().join(bucket),
            bucket: bucket.to_string(),
            prefix: prefix.trim_matches('/').to_string(),
        })
    }

    /// Create a store and make sure its bucket exists.
    pub async fn open(root: impl Into<PathBuf>, bucket: &str, prefix: &str) -> Result<Self> {
        let store = Self::new(root, bucket, prefix)?;
        store.ensure_bucket().await?;
        Ok(store)
    }

    pub fn bucket_dir(&self) -> &Path {
        &self.bucket_dir
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.bucket_dir.join(key)
    }

    fn locator(&self, key: &str) -> String {
        format!("fs://{}/{}", self.bucket, key)
    }
}

/// Sibling path for an in-flight write of `path`.
///
/// `~` is outside the item id alphabet, so no object key can name a temp file,
/// and the random suffix keeps concurrent writers of one key apart.
fn temp_path_for(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_owned();
    name.push(format!("~{}.part", short_id()));
    path.with_file_name(name)
}

async fn write_object_file(path: &Path, data: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let temp_path = temp_path_for(path);
    if let Err(e) = write_private(&temp_path, data).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e);
    }

    if let Err(e) = tokio::fs::rename(&temp_path, path).await {
        let _ = tokio::fs::remove_file(&temp_path).await;
        return Err(e.into());
    }
    Ok(())
}

async fn write_private(path: &Path, data: &[u8]) -> Result<()> {
    tokio::fs::write(path, data).await?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        let perms = std::fs::Permissions::from_mode(0o600);
        tokio::fs::set_permissions(path, perms).await?;
    }
    Ok(())
}

#[async_trait]
impl ObjectStore for FsObjectStore {
    async fn ensure_bucket(&self) -> Result<()> {
        if tokio::fs::try_exists(&self.bucket_dir).await? {
            return Ok(());
        }
        tokio::fs::create_dir_all(&self.bucket_dir).await?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o700);
            tokio::fs::set_permissions(&self.bucket_dir, perms).await?;
        }

        info!(bucket = %self.bucket, path = %self.bucket_dir.display(), "created object bucket");
        Ok(())
    }

    async fn upload_file(&self, id: &str, data: &[u8]) -> Result<String> {
        let key = object_key(&self.prefix, id)?;
        let path = self.object_path(&key);
        write_object_file(&path, data).await?;
        debug!(key, size = data.len(), "stored object");
        Ok(self.locator(&key))
    }

    async fn get_file(&self, filter: &ItemFilter) -> Result<Option<Vec<u8>>> {
        let key = object_key(&self.prefix, filter_id(filter)?)?;
        match tokio::fs::read(self.object_path(&key)).await {
            Ok(data) => Ok(Some(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_file(&self, filter: &ItemFilter) -> Result<()> {
        let key = object_key(&self.prefix, filter_id(filter)?)?;
        match tokio::fs::remove_file(self.object_path(&key)).await {
            Ok(()) => {
                debug!(key, "deleted object");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::super::contract;
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_round_trip() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "secrets", "uploads").await.unwrap();
        contract::round_trip(&store).await;
        assert!(dir.path().join("secrets/uploads/b1").is_file());
    }

    #[tokio::test]
    async fn test_missing_and_delete() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "secrets", "uploads").await.unwrap();
        contract::missing_and_delete(&store).await;
    }

    #[tokio::test]
    async fn test_rejects_bad_ids() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "secrets", "uploads").await.unwrap();
        contract::rejects_bad_ids(&store).await;
    }

    #[tokio::test]
    async fn test_ensure_bucket_idempotent() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::new(dir.path(), "secrets", "uploads").unwrap();
        assert!(!store.bucket_dir().exists());
        store.ensure_bucket().await.unwrap();
        store.ensure_bucket().await.unwrap();
        assert!(store.bucket_dir().is_dir());
    }

    #[test]
    fn test_invalid_bucket_name() {
        assert!(FsObjectStore::new("/tmp", "../up", "uploads").is_err());
    }

    #[tokio::test]
    async fn test_dotted_ids_do_not_share_files() {
        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "secrets", "uploads").await.unwrap();

        store.upload_file("b1.part", b"first").await.unwrap();
        store.upload_file("b1", b"second").await.unwrap();

        let first = store.get_file(&ItemFilter::by_id("b1.part")).await.unwrap();
        let second = store.get_file(&ItemFilter::by_id("b1")).await.unwrap();
        assert_eq!(first.as_deref(), Some(&b"first"[..]));
        assert_eq!(second.as_deref(), Some(&b"second"[..]));
    }

    #[tokio::test]
    async fn test_concurrent_uploads_same_id() {
        let dir = tempdir().unwrap();
        let store = std::sync::Arc::new(
            FsObjectStore::open(dir.path(), "secrets", "uploads").await.unwrap(),
        );

        let payloads: Vec<Vec<u8>> = (0u8..8).map(|i| vec![i; 64 * 1024]).collect();
        let mut handles = Vec::new();
        for payload in payloads.clone() {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.upload_file("shared", &payload).await
            }));
        }
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let stored = store
            .get_file(&ItemFilter::by_id("shared"))
            .await
            .unwrap()
            .unwrap();
        assert!(payloads.contains(&stored), "object is a mix of writes");

        let leftovers: Vec<_> = std::fs::read_dir(dir.path().join("secrets/uploads"))
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .filter(|name| name != "shared")
            .collect();
        assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
    }

    #[test]
    fn test_temp_path_is_not_an_object_key() {
        let path = Path::new("/data/secrets/uploads/b1");
        let temp = temp_path_for(path);
        assert_eq!(temp.parent(), path.parent());
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("b1~"));
        assert!(!is_valid_object_id(name));
        assert_ne!(temp, temp_path_for(path));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_object_file_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempdir().unwrap();
        let store = FsObjectStore::open(dir.path(), "secrets", "uploads").await.unwrap();
        store.upload_file("b1", b"secret").await.unwrap();

        let meta = std::fs::metadata(dir.path().join("secrets/uploads/b1")).unwrap();
        assert_eq!(meta.permissions().mode() & 0o777, 0o600);
    }
}
