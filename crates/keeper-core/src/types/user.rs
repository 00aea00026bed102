//! User account types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::filter::non_empty;

/// A registered user.
///
/// `password_hash` is a PHC string; it is never serialized outward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserAccount {
    pub user_id: String,

    pub username: String,

    #[serde(default, skip_serializing)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Fields supplied when creating a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUserAccount {
    pub user_id: String,
    pub username: String,
    pub password_hash: String,
}

impl NewUserAccount {
    pub fn into_row(self, now: DateTime<Utc>) -> UserAccount {
        UserAccount {
            user_id: self.user_id,
            username: self.username,
            password_hash: self.password_hash,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Partial update of a user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserPatch {
    pub username: Option<String>,
    pub password_hash: Option<String>,
}

impl UserPatch {
    pub fn is_empty(&self) -> bool {
        self.username.is_none() && self.password_hash.is_none()
    }

    pub fn apply(&self, user: &mut UserAccount, now: DateTime<Utc>) {
        if self.is_empty() {
            return;
        }
        if let Some(username) = &self.username {
            user.username = username.clone();
        }
        if let Some(hash) = &self.password_hash {
            user.password_hash = hash.clone();
        }
        user.updated_at = now;
    }
}

/// Exact-match filter for a single user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilter {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

impl UserFilter {
    pub fn by_id(user_id: impl Into<String>) -> Self {
        Self {
            user_id: Some(user_id.into()),
            username: None,
        }
    }

    pub fn by_username(username: impl Into<String>) -> Self {
        Self {
            user_id: None,
            username: Some(username.into()),
        }
    }

    pub fn is_valid(&self) -> bool {
        non_empty(&self.user_id).is_some() || non_empty(&self.username).is_some()
    }

    pub fn matches(&self, user: &UserAccount) -> bool {
        self.is_valid()
            && non_empty(&self.user_id).map_or(true, |v| user.user_id == v)
            && non_empty(&self.username).map_or(true, |v| user.username == v)
    }
}

/// Multi-record filter for users. Time bounds are inclusive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserListFilter {
    pub user_id: Option<String>,
    pub user_ids: Option<Vec<String>>,
    pub username: Option<String>,
    pub created_before: Option<DateTime<Utc>>,
    pub created_after: Option<DateTime<Utc>>,
    pub updated_before: Option<DateTime<Utc>>,
    pub updated_after: Option<DateTime<Utc>>,
}

impl UserListFilter {
    pub fn matches(&self, user: &UserAccount) -> bool {
        non_empty(&self.user_id).map_or(true, |v| user.user_id == v)
            && self
                .user_ids
                .as_ref()
                .map_or(true, |ids| ids.contains(&user.user_id))
            && non_empty(&self.username).map_or(true, |v| user.username == v)
            && self.created_before.map_or(true, |t| user.created_at <= t)
            && self.created_after.map_or(true, |t| user.created_at >= t)
            && self.updated_before.map_or(true, |t| user.updated_at <= t)
            && self.updated_after.map_or(true, |t| user.updated_at >= t)
    }
}
