//! Data item engine.
//!
//! Decides per item type where the payload lives and keeps the metadata and
//! object stores consistent across create, update and delete. Binary payloads
//! go to the object store and the row records their locator; every other type
//! keeps its payload inline in the row.
//!
//! The two stores cannot share a transaction. Create therefore runs as a
//! compensated sequence: insert the row, upload the object, record the
//! locator, commit; if anything after the upload fails, the object is deleted
//! again on a best-effort basis.

use keeper_core::id::is_valid_object_id;
use keeper_core::types::{
    non_empty, DataItem, DataItemPatch, ItemFilter, ListFilter, NewDataItem,
};
use keeper_storage::{complete, MetadataStore, MetadataTx, ObjectStore};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{Result, VaultError};

/// Orchestrates the metadata and object stores.
pub struct DataItemEngine {
    metadata: Arc<dyn MetadataStore>,
    objects: Arc<dyn ObjectStore>,
}

fn require_valid(filter: &ItemFilter) -> Result<()> {
    if filter.is_valid() {
        Ok(())
    } else {
        Err(VaultError::InvalidInput(
            "filter must set at least one of id, owner_id, type".to_string(),
        ))
    }
}

/// Filter that selects exactly the stored row.
fn exact(item: &DataItem) -> ItemFilter {
    ItemFilter::by_id(item.id.clone()).owned_by(item.owner_id.clone())
}

impl DataItemEngine {
    pub fn new(metadata: Arc<dyn MetadataStore>, objects: Arc<dyn ObjectStore>) -> Self {
        Self { metadata, objects }
    }

    /// Read one item with its payload materialised.
    ///
    /// Returns `Ok(None)` when no row matches, or when the row is binary and
    /// its object is missing.
    pub async fn get(&self, filter: &ItemFilter) -> Result<Option<DataItem>> {
        require_valid(filter)?;

        let Some(mut item) = self
            .metadata
            .get(filter)
            .await
            .map_err(|e| VaultError::storage("read item", e))?
        else {
            return Ok(None);
        };

        if item.item_type.is_external() {
            let object = self
                .objects
                .get_file(&ItemFilter::by_id(item.id.clone()))
                .await
                .map_err(|e| VaultError::storage("read object", e))?;
            match object {
                Some(bytes) => item.data = bytes,
                None => {
                    warn!(id = %item.id, url = %item.url, "binary item has no object");
                    return Ok(None);
                }
            }
        }

        Ok(Some(item))
    }

    /// List rows. Binary payloads are not read back.
    pub async fn list(&self, filter: &ListFilter) -> Result<Vec<DataItem>> {
        self.metadata
            .list(filter)
            .await
            .map_err(|e| VaultError::storage("list items", e))
    }

    /// Create an item, returning it with its payload and locator filled in.
    pub async fn create(&self, item: NewDataItem) -> Result<DataItem> {
        if item.id.is_empty() || item.owner_id.is_empty() {
            return Err(VaultError::InvalidInput(
                "item id and owner are required".to_string(),
            ));
        }
        if !is_valid_object_id(&item.id) {
            return Err(VaultError::InvalidInput(format!(
                "invalid item id '{}'",
                item.id
            )));
        }

        let payload = item.data.clone();
        let mut tx = self
            .metadata
            .begin()
            .await
            .map_err(|e| VaultError::storage("begin create", e))?;

        let mut uploaded = None;
        let result = self
            .create_steps(tx.as_mut(), item, &mut uploaded)
            .await;
        let result = complete(tx, result).await;

        match result {
            Ok(mut created) => {
                created.data = payload;
                debug!(id = %created.id, item_type = %created.item_type, "created item");
                Ok(created)
            }
            Err(err) => {
                if let Some((id, locator)) = uploaded {
                    self.compensate_upload(&id, &locator).await;
                }
                Err(err)
            }
        }
    }

    async fn create_steps(
        &self,
        tx: &mut dyn MetadataTx,
        item: NewDataItem,
        uploaded: &mut Option<(String, String)>,
    ) -> Result<DataItem> {
        let external = item.item_type.is_external();
        let payload = if external { Some(item.data.clone()) } else { None };

        let mut row = tx
            .create(item)
            .await
            .map_err(|e| VaultError::storage("insert item", e))?;

        if let Some(bytes) = payload {
            let locator = self
                .objects
                .upload_file(&row.id, &bytes)
                .await
                .map_err(|e| VaultError::storage("upload object", e))?;
            *uploaded = Some((row.id.clone(), locator.clone()));

            tx.update(&exact(&row), &DataItemPatch::new().url(locator.clone()))
                .await
                .map_err(|e| VaultError::storage("record object locator", e))?;
            row.url = locator;
        }

        Ok(row)
    }

    async fn compensate_upload(&self, id: &str, locator: &str) {
        match self.objects.delete_file(&ItemFilter::by_id(id)).await {
            Ok(()) => debug!(id, locator, "removed object after failed create"),
            Err(e) => warn!(id, locator, error = %e, "orphaned object: cleanup after failed create failed"),
        }
    }

    /// Apply a partial update to the one item the filter selects.
    ///
    /// A missing item is an error here, unlike [`DataItemEngine::get`]. For a
    /// binary item, new payload bytes replace the stored object and only the
    /// locator is written to the row.
    pub async fn update(&self, filter: &ItemFilter, patch: DataItemPatch) -> Result<()> {
        require_valid(filter)?;

        let existing = self
            .metadata
            .get(filter)
            .await
            .map_err(|e| VaultError::storage("read item", e))?
            .ok_or_else(|| VaultError::RecordNotFound(describe(filter)))?;

        let mut patch = patch;
        if let Some(item_type) = patch.item_type.take() {
            if item_type != existing.item_type {
                return Err(VaultError::InvalidInput(format!(
                    "item type cannot change from {} to {}",
                    existing.item_type, item_type
                )));
            }
        }
        if let Some(owner_id) = patch.owner_id.take() {
            if owner_id != existing.owner_id {
                return Err(VaultError::InvalidInput(
                    "item owner cannot change".to_string(),
                ));
            }
        }
        // locators are engine-managed
        patch.url = None;

        if existing.item_type.is_external() {
            if let Some(bytes) = patch.data.take() {
                let locator = self
                    .objects
                    .upload_file(&existing.id, &bytes)
                    .await
                    .map_err(|e| VaultError::storage("upload object", e))?;
                patch.url = Some(locator);
            }
        }

        if patch.is_empty() {
            return Ok(());
        }

        self.metadata
            .update(&exact(&existing), &patch)
            .await
            .map_err(|e| VaultError::storage("update item", e))?;
        debug!(id = %existing.id, "updated item");
        Ok(())
    }

    /// Delete the one item the filter selects, object first.
    pub async fn delete(&self, filter: &ItemFilter) -> Result<()> {
        require_valid(filter)?;

        let existing = self
            .metadata
            .get(filter)
            .await
            .map_err(|e| VaultError::storage("read item", e))?
            .ok_or_else(|| VaultError::RecordNotFound(describe(filter)))?;

        if existing.item_type.is_external() {
            self.objects
                .delete_file(&ItemFilter::by_id(existing.id.clone()))
                .await
                .map_err(|e| VaultError::storage("delete object", e))?;
        }

        let removed = self.metadata.delete(&exact(&existing)).await;
        if let Err(e) = removed {
            if existing.item_type.is_external() {
                warn!(id = %existing.id, url = %existing.url, "row outlived its deleted object");
            }
            return Err(VaultError::storage("delete item", e));
        }
        debug!(id = %existing.id, "deleted item");
        Ok(())
    }
}

fn describe(filter: &ItemFilter) -> String {
    match non_empty(&filter.id) {
        Some(id) => id.to_string(),
        None => "no item matches filter".to_string(),
    }
}
