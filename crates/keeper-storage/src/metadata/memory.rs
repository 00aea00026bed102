//! In-memory metadata store.

use async_trait::async_trait;
use keeper_core::types::{DataItem, DataItemPatch, ItemFilter, ListFilter, NewDataItem};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::{require_valid, MetadataStore, MetadataTx};
use crate::error::{Result, StorageError};
use crate::faults::Faults;
use crate::now;

type Rows = BTreeMap<String, DataItem>;

/// Metadata store held in process memory.
///
/// A transaction takes the table's write lock for its whole lifetime and
/// keeps an undo log, so writers are serialised the way SQLite serialises them.
#[derive(Clone, Default)]
pub struct MemoryMetadataStore {
    rows: Arc<RwLock<Rows>>,
    faults: Faults,
}

impl MemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Failure injection handle. Operation names: `get`, `list`, `create`,
    /// `update`, `delete`, `begin`, `commit`.
    pub fn faults(&self) -> &Faults {
        &self.faults
    }

    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }
}

fn first_match(rows: &Rows, filter: &ItemFilter) -> Option<DataItem> {
    let mut matches: Vec<&DataItem> = rows.values().filter(|i| filter.matches(i)).collect();
    matches.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
    matches.first().map(|i| (*i).clone())
}

fn insert_row(rows: &mut Rows, item: NewDataItem) -> Result<DataItem> {
    if rows.contains_key(&item.id) {
        return Err(StorageError::Duplicate(item.id));
    }
    let row = item.into_row(now());
    rows.insert(row.id.clone(), row.clone());
    Ok(row)
}

/// Apply `patch` to matching rows, returning the previous versions.
fn patch_rows(rows: &mut Rows, filter: &ItemFilter, patch: &DataItemPatch) -> Vec<DataItem> {
    if patch.is_empty() {
        return Vec::new();
    }
    let at = now();
    let mut previous = Vec::new();
    for item in rows.values_mut().filter(|i| filter.matches(i)) {
        previous.push(item.clone());
        patch.apply(item, at);
    }
    previous
}

#[async_trait]
impl MetadataStore for MemoryMetadataStore {
    async fn get(&self, filter: &ItemFilter) -> Result<Option<DataItem>> {
        require_valid(filter)?;
        self.faults.check("get").await?;
        Ok(first_match(&*self.rows.read().await, filter))
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<DataItem>> {
        self.faults.check("list").await?;
        let rows = self.rows.read().await;
        let mut items: Vec<DataItem> = rows.values().filter(|i| filter.matches(i)).cloned().collect();
        items.sort_by(|a, b| (a.created_at, &a.id).cmp(&(b.created_at, &b.id)));
        Ok(items)
    }

    async fn create(&self, item: NewDataItem) -> Result<DataItem> {
        self.faults.check("create").await?;
        insert_row(&mut *self.rows.write().await, item)
    }

    async fn update(&self, filter: &ItemFilter, patch: &DataItemPatch) -> Result<u64> {
        require_valid(filter)?;
        self.faults.check("update").await?;
        let changed = patch_rows(&mut *self.rows.write().await, filter, patch);
        Ok(changed.len() as u64)
    }

    async fn delete(&self, filter: &ItemFilter) -> Result<u64> {
        require_valid(filter)?;
        self.faults.check("delete").await?;
        let mut rows = self.rows.write().await;
        let before = rows.len();
        rows.retain(|_, item| !filter.matches(item));
        Ok((before - rows.len()) as u64)
    }

    async fn begin(&self) -> Result<Box<dyn MetadataTx>> {
        self.faults.check("begin").await?;
        let guard = self.rows.clone().write_owned().await;
        Ok(Box::new(MemoryMetadataTx {
            rows: guard,
            undo: Vec::new(),
            faults: self.faults.clone(),
            finished: false,
        }))
    }
}

enum Undo {
    Remove(String),
    Restore(DataItem),
}

/// Transaction over [`MemoryMetadataStore`].
pub struct MemoryMetadataTx {
    rows: OwnedRwLockWriteGuard<Rows>,
    undo: Vec<Undo>,
    faults: Faults,
    finished: bool,
}

impl MemoryMetadataTx {
    fn revert(&mut self) {
        while let Some(step) = self.undo.pop() {
            match step {
                Undo::Remove(id) => {
                    self.rows.remove(&id);
                }
                Undo::Restore(item) => {
                    self.rows.insert(item.id.clone(), item);
                }
            }
        }
    }
}

impl Drop for MemoryMetadataTx {
    fn drop(&mut self) {
        if !self.finished {
            self.revert();
        }
    }
}

#[async_trait]
impl MetadataTx for MemoryMetadataTx {
    async fn get(&mut self, filter: &ItemFilter) -> Result<Option<DataItem>> {
        require_valid(filter)?;
        self.faults.check("get").await?;
        Ok(first_match(&self.rows, filter))
    }

    async fn create(&mut self, item: NewDataItem) -> Result<DataItem> {
        self.faults.check("create").await?;
        let row = insert_row(&mut self.rows, item)?;
        self.undo.push(Undo::Remove(row.id.clone()));
        Ok(row)
    }

    async fn update(&mut self, filter: &ItemFilter, patch: &DataItemPatch) -> Result<u64> {
        require_valid(filter)?;
        self.faults.check("update").await?;
        let previous = patch_rows(&mut self.rows, filter, patch);
        let changed = previous.len() as u64;
        self.undo.extend(previous.into_iter().map(Undo::Restore));
        Ok(changed)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let mut tx = self;
        // a failed commit leaves the transaction to roll back on drop
        tx.faults.check("commit").await?;
        tx.finished = true;
        tx.undo.clear();
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        let mut tx = self;
        tx.revert();
        tx.finished = true;
        Ok(())
    }
}
