//! Access control: caller resolution and owner scoping.
//!
//! Every data item request is rewritten so that its owner fields name the
//! authenticated caller, whatever the client sent. The engine never sees an
//! unscoped filter from a request path.

use keeper_core::types::{
    CallerIdentity, DataItemPatch, ItemFilter, ListFilter, NewDataItem, UserFilter,
};
use keeper_storage::UserStore;
use std::sync::Arc;
use tracing::debug;

use crate::error::{Result, VaultError};
use crate::token::TokenIssuer;

const BEARER_PREFIX: &str = "Bearer ";

/// Resolves bearer credentials to a caller identity.
pub struct AccessGuard {
    issuer: Arc<TokenIssuer>,
    users: Arc<dyn UserStore>,
}

impl AccessGuard {
    pub fn new(issuer: Arc<TokenIssuer>, users: Arc<dyn UserStore>) -> Self {
        Self { issuer, users }
    }

    /// Resolve an `Authorization` header value.
    ///
    /// Fails with [`VaultError::Unauthenticated`] when the header is absent,
    /// not a bearer credential, fails verification, or names an account that
    /// no longer exists.
    pub async fn resolve(&self, authorization: Option<&str>) -> Result<CallerIdentity> {
        let header = authorization
            .ok_or_else(|| VaultError::Unauthenticated("missing credential".to_string()))?;
        let token = header
            .strip_prefix(BEARER_PREFIX)
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| VaultError::Unauthenticated("expected bearer credential".to_string()))?;

        let identity = self.issuer.verify(token)?;

        let known = self
            .users
            .exists(&UserFilter::by_id(identity.user_id.clone()))
            .await
            .map_err(|e| VaultError::storage("resolve caller", e))?;
        if !known {
            return Err(VaultError::Unauthenticated("unknown account".to_string()));
        }

        debug!(user_id = %identity.user_id, "caller resolved");
        Ok(identity)
    }
}

/// Pin a single-item filter to the caller.
pub fn scope_filter(caller: &CallerIdentity, mut filter: ItemFilter) -> ItemFilter {
    filter.owner_id = Some(caller.user_id.clone());
    filter
}

/// Pin a list filter to the caller, discarding any other owner selection.
pub fn scope_list(caller: &CallerIdentity, mut filter: ListFilter) -> ListFilter {
    filter.owner_id = Some(caller.user_id.clone());
    filter.owner_ids = None;
    filter
}

/// Stamp a new item with the caller as owner.
pub fn scope_new_item(caller: &CallerIdentity, mut item: NewDataItem) -> NewDataItem {
    item.owner_id = caller.user_id.clone();
    item
}

/// Strip ownership changes from a patch.
pub fn scope_patch(mut patch: DataItemPatch) -> DataItemPatch {
    patch.owner_id = None;
    patch
}
