//! Record selection filters for data items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{DataItem, ItemType};

/// Treat an empty string the same as an unset field.
pub fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().filter(|v| !v.is_empty())
}

/// Exact-match filter used by single-record reads, updates and deletes.
///
/// Set fields are combined with AND. A filter with no field set selects
/// nothing; callers must check [`ItemFilter::is_valid`] before using it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl ItemFilter {
    /// Filter selecting a record by id.
    pub fn by_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Default::default()
        }
    }

    pub fn owned_by(mut self, owner_id: impl Into<String>) -> Self {
        self.owner_id = Some(owner_id.into());
        self
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    /// At least one selecting field must be present.
    pub fn is_valid(&self) -> bool {
        non_empty(&self.id).is_some()
            || non_empty(&self.owner_id).is_some()
            || self.item_type.is_some()
            || non_empty(&self.meta).is_some()
            || non_empty(&self.url).is_some()
    }

    pub fn matches(&self, item: &DataItem) -> bool {
        if !self.is_valid() {
            return false;
        }
        non_empty(&self.id).map_or(true, |v| item.id == v)
            && non_empty(&self.owner_id).map_or(true, |v| item.owner_id == v)
            && self.item_type.map_or(true, |t| item.item_type == t)
            && non_empty(&self.meta).map_or(true, |v| item.meta == v)
            && non_empty(&self.url).map_or(true, |v| item.url == v)
    }
}

/// Multi-record filter used by listing.
///
/// Time bounds are inclusive. An empty filter selects every record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ids: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner_ids: Option<Vec<String>>,

    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub item_type: Option<ItemType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_before: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_after: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_before: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_after: Option<DateTime<Utc>>,
}

impl ListFilter {
    pub fn owned_by(owner_id: impl Into<String>) -> Self {
        Self {
            owner_id: Some(owner_id.into()),
            ..Default::default()
        }
    }

    pub fn with_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    pub fn matches(&self, item: &DataItem) -> bool {
        non_empty(&self.id).map_or(true, |v| item.id == v)
            && self.ids.as_ref().map_or(true, |ids| ids.contains(&item.id))
            && non_empty(&self.owner_id).map_or(true, |v| item.owner_id == v)
            && self
                .owner_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&item.owner_id))
            && self.item_type.map_or(true, |t| item.item_type == t)
            && non_empty(&self.meta).map_or(true, |v| item.meta == v)
            && non_empty(&self.url).map_or(true, |v| item.url == v)
            && self.created_before.map_or(true, |t| item.created_at <= t)
            && self.created_after.map_or(true, |t| item.created_at >= t)
            && self.updated_before.map_or(true, |t| item.updated_at <= t)
            && self.updated_after.map_or(true, |t| item.updated_at >= t)
    }
}
