//! # keeper-storage
//!
//! Persistence backends for Keeper.
//!
//! - [`MetadataStore`]: relational table of data item rows, with transactions
//! - [`ObjectStore`]: key-addressed blob storage for binary payloads
//! - [`UserStore`]: relational table of user accounts
//!
//! Each store has a SQLite or filesystem implementation for production use and
//! an in-memory implementation that doubles as a test fixture.

pub mod error;
pub mod faults;
pub mod metadata;
pub mod objects;
pub mod sqlite;
pub mod users;

pub use error::{Result, StorageError};
pub use faults::Faults;
pub use metadata::{complete, MemoryMetadataStore, MetadataStore, MetadataTx, SqliteMetadataStore};
pub use objects::{FsObjectStore, MemoryObjectStore, ObjectStore};
pub use users::{MemoryUserStore, SqliteUserStore, UserStore};

use chrono::{DateTime, TimeZone, Utc};
use keeper_core::config::{Config, ObjectBackend};
use std::sync::Arc;
use tracing::info;

/// Current time truncated to the millisecond precision rows are stored with.
pub(crate) fn now() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis()).unwrap_or_else(Utc::now)
}

pub(crate) fn from_millis(ms: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms).single()
}

/// The three stores a Keeper server runs on.
#[derive(Clone)]
pub struct Backends {
    pub metadata: Arc<dyn MetadataStore>,
    pub objects: Arc<dyn ObjectStore>,
    pub users: Arc<dyn UserStore>,
}

impl Backends {
    /// Open every backend named by the configuration.
    ///
    /// The SQLite schema and the object bucket are created if absent.
    pub async fn open(config: &Config) -> Result<Self> {
        let url = config.database.resolved_url()?;
        let pool = sqlite::open_pool(&url, &config.database).await?;
        sqlite::migrate(&pool).await?;
        info!(url = %url, "metadata database ready");

        let objects: Arc<dyn ObjectStore> = match config.objects.backend {
            ObjectBackend::Fs => {
                let root = config.objects.resolved_root()?;
                Arc::new(
                    FsObjectStore::open(root, &config.objects.bucket, &config.objects.prefix)
                        .await?,
                )
            }
            ObjectBackend::Memory => Arc::new(MemoryObjectStore::new(
                &config.objects.bucket,
                &config.objects.prefix,
            )),
        };

        Ok(Self {
            metadata: Arc::new(SqliteMetadataStore::new(pool.clone())),
            objects,
            users: Arc::new(SqliteUserStore::new(pool)),
        })
    }

    /// Fully in-memory backends.
    pub fn in_memory() -> Self {
        Self {
            metadata: Arc::new(MemoryMetadataStore::new()),
            objects: Arc::new(MemoryObjectStore::new("secrets", "uploads")),
            users: Arc::new(MemoryUserStore::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use keeper_core::types::{ItemFilter, ItemType, NewDataItem};
    use tempfile::tempdir;

    #[test]
    fn test_now_is_millisecond_precise() {
        let t = now();
        assert_eq!(from_millis(t.timestamp_millis()), Some(t));
    }

    #[tokio::test]
    async fn test_open_from_config() {
        let dir = tempdir().unwrap();
        let mut config = Config::default();
        config.database.url = Some(dir.path().join("db").join("keeper.db").display().to_string());
        config.objects.root = Some(dir.path().join("objects"));

        let backends = Backends::open(&config).await.unwrap();
        assert!(dir.path().join("objects").join("secrets").is_dir());

        backends
            .metadata
            .create(NewDataItem::new("a1", "u1", ItemType::Text, "hello"))
            .await
            .unwrap();
        let item = backends
            .metadata
            .get(&ItemFilter::by_id("a1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(item.data, b"hello");
    }
}
