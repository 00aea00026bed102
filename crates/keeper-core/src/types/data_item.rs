//! Data item types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

/// Kind of secret stored in a data item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
    /// Login/password pair.
    #[serde(alias = "login_password")]
    Credentials,

    /// Free text.
    Text,

    /// Arbitrary binary blob, kept in the object store.
    Binary,

    /// Bank card details.
    BankCard,
}

impl ItemType {
    /// All item types.
    pub fn all() -> &'static [ItemType] {
        &[Self::Credentials, Self::Text, Self::Binary, Self::BankCard]
    }

    /// Canonical storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Credentials => "credentials",
            Self::Text => "text",
            Self::Binary => "binary",
            Self::BankCard => "bank_card",
        }
    }

    /// Whether the payload of record lives in the object store.
    pub fn is_external(&self) -> bool {
        matches!(self, Self::Binary)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ItemType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "credentials" | "login_password" => Ok(Self::Credentials),
            "text" => Ok(Self::Text),
            "binary" => Ok(Self::Binary),
            "bank_card" => Ok(Self::BankCard),
            other => Err(Error::UnknownItemType(other.to_string())),
        }
    }
}

/// A persisted secret record.
///
/// For [`ItemType::Binary`] the `data` field is only populated after the
/// payload has been read back from the object store; the metadata row keeps
/// an empty payload and points at the object through `url`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataItem {
    pub id: String,

    pub owner_id: String,

    #[serde(rename = "type")]
    pub item_type: ItemType,

    #[serde(with = "super::b64")]
    pub data: Vec<u8>,

    #[serde(default)]
    pub meta: String,

    #[serde(default)]
    pub url: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a data item. Timestamps are server-assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewDataItem {
    pub id: String,
    pub owner_id: String,
    pub item_type: ItemType,
    pub data: Vec<u8>,
    pub meta: String,
}

impl NewDataItem {
    pub fn new(
        id: impl Into<String>,
        owner_id: impl Into<String>,
        item_type: ItemType,
        data: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            id: id.into(),
            owner_id: owner_id.into(),
            item_type,
            data: data.into(),
            meta: String::new(),
        }
    }

    pub fn with_meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = meta.into();
        self
    }

    /// The row as inserted into the metadata store.
    ///
    /// External payloads are never written inline and the URL starts empty.
    pub fn into_row(self, now: DateTime<Utc>) -> DataItem {
        let data = if self.item_type.is_external() {
            Vec::new()
        } else {
            self.data
        };
        DataItem {
            id: self.id,
            owner_id: self.owner_id,
            item_type: self.item_type,
            data,
            meta: self.meta,
            url: String::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a data item. Unset fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataItemPatch {
    pub owner_id: Option<String>,
    pub item_type: Option<ItemType>,
    pub data: Option<Vec<u8>>,
    pub meta: Option<String>,
    pub url: Option<String>,
}

impl DataItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn data(mut self, data: impl Into<Vec<u8>>) -> Self {
        self.data = Some(data.into());
        self
    }

    pub fn meta(mut self, meta: impl Into<String>) -> Self {
        self.meta = Some(meta.into());
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn item_type(mut self, item_type: ItemType) -> Self {
        self.item_type = Some(item_type);
        self
    }

    /// True when no field is set.
    pub fn is_empty(&self) -> bool {
        self.owner_id.is_none()
            && self.item_type.is_none()
            && self.data.is_none()
            && self.meta.is_none()
            && self.url.is_none()
    }

    /// Apply the patch to a row, refreshing `updated_at` when anything changed.
    pub fn apply(&self, item: &mut DataItem, now: DateTime<Utc>) {
        if self.is_empty() {
            return;
        }
        if let Some(owner_id) = &self.owner_id {
            item.owner_id = owner_id.clone();
        }
        if let Some(item_type) = self.item_type {
            item.item_type = item_type;
        }
        if let Some(data) = &self.data {
            item.data = data.clone();
        }
        if let Some(meta) = &self.meta {
            item.meta = meta.clone();
        }
        if let Some(url) = &self.url {
            item.url = url.clone();
        }
        item.updated_at = now;
    }
}
