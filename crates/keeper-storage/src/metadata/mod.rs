//! Metadata store: the relational table of data item rows.
//!
//! Single-row operations take an [`ItemFilter`] and refuse an empty one with
//! [`StorageError::InvalidInput`], so a missing predicate can never turn into
//! a full-table update or delete. Listing takes a [`ListFilter`], where an empty
//! filter is allowed and selects every row.

mod memory;
mod sqlite;

pub use memory::MemoryMetadataStore;
pub use sqlite::SqliteMetadataStore;

use async_trait::async_trait;
use keeper_core::types::{DataItem, DataItemPatch, ItemFilter, ListFilter, NewDataItem};
use tracing::warn;

use crate::error::{Result, StorageError};

/// Repository of data item rows.
#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Fetch at most one row. `Ok(None)` when nothing matches.
    async fn get(&self, filter: &ItemFilter) -> Result<Option<DataItem>>;

    /// Fetch every matching row, ordered by creation time then id.
    async fn list(&self, filter: &ListFilter) -> Result<Vec<DataItem>>;

    /// Insert a row. A colliding id fails with [`StorageError::Duplicate`].
    async fn create(&self, item: NewDataItem) -> Result<DataItem>;

    /// Apply a partial update to matching rows and return how many changed.
    async fn update(&self, filter: &ItemFilter, patch: &DataItemPatch) -> Result<u64>;

    /// Delete matching rows and return how many were removed.
    async fn delete(&self, filter: &ItemFilter) -> Result<u64>;

    /// Open a transaction.
    async fn begin(&self) -> Result<Box<dyn MetadataTx>>;
}

/// An open metadata transaction.
///
/// Dropping a transaction without committing rolls it back.
#[async_trait]
pub trait MetadataTx: Send {
    async fn get(&mut self, filter: &ItemFilter) -> Result<Option<DataItem>>;

    async fn create(&mut self, item: NewDataItem) -> Result<DataItem>;

    async fn update(&mut self, filter: &ItemFilter, patch: &DataItemPatch) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

/// Finish a transaction according to the outcome of its body.
///
/// Commits on `Ok`, rolls back on `Err`. A failed commit is returned as the
/// error; a failed rollback is logged and the body's error is returned.
pub async fn complete<T, E>(tx: Box<dyn MetadataTx>, result: std::result::Result<T, E>) -> std::result::Result<T, E>
where
    E: From<StorageError> + std::fmt::Display,
{
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                warn!(error = %rollback_err, cause = %err, "transaction rollback failed");
            }
            Err(err)
        }
    }
}

pub(crate) fn require_valid(filter: &ItemFilter) -> Result<()> {
    if filter.is_valid() {
        Ok(())
    } else {
        Err(StorageError::InvalidInput(
            "item filter must set at least one of id, owner_id, type, meta, url".to_string(),
        ))
    }
}
