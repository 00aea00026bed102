//! Data item handlers.
//!
//! Every handler here needs a resolved caller. Owner fields sent by the
//! client are ignored; the guard stamps the caller's id on every filter,
//! new item and patch before the engine sees it.

use super::HandlerContext;
use crate::error::GatewayError;
use crate::methods::{parse_params, CallContext, MethodHandler};
use crate::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use keeper_core::id;
use keeper_core::types::{b64, DataItemPatch, ItemFilter, ItemType, ListFilter, NewDataItem};
use keeper_vault::guard::{scope_filter, scope_list, scope_new_item, scope_patch};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;

/// Empty means "not given".
fn parse_type(value: &str) -> Result<Option<ItemType>> {
    if value.is_empty() {
        return Ok(None);
    }
    value
        .parse()
        .map(Some)
        .map_err(|e: keeper_core::Error| GatewayError::InvalidParams(e.to_string()))
}

fn non_empty(value: String) -> Option<String> {
    (!value.is_empty()).then_some(value)
}

#[derive(Debug, Default, Deserialize)]
struct GetDataParams {
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    item_type: String,
    #[serde(default)]
    meta: String,
    #[serde(default)]
    url: String,
}

/// `data.get`: read at most one item.
pub struct GetDataHandler {
    context: Arc<HandlerContext>,
}

impl GetDataHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for GetDataHandler {
    async fn call(&self, ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let caller = ctx.caller()?;
        let params: GetDataParams = parse_params(params)?;

        let filter = ItemFilter {
            id: non_empty(params.id),
            owner_id: None,
            item_type: parse_type(&params.item_type)?,
            meta: non_empty(params.meta),
            url: non_empty(params.url),
        };
        let item = self
            .context
            .vault
            .engine
            .get(&scope_filter(caller, filter))
            .await?;

        let found = item.is_some();
        Ok(json!({ "found": found, "items": item.into_iter().collect::<Vec<_>>() }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct ListDataParams {
    #[serde(default)]
    id: String,
    #[serde(default)]
    ids: Option<Vec<String>>,
    #[serde(default, rename = "type")]
    item_type: String,
    #[serde(default)]
    meta: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    created_before: Option<DateTime<Utc>>,
    #[serde(default)]
    created_after: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_before: Option<DateTime<Utc>>,
    #[serde(default)]
    updated_after: Option<DateTime<Utc>>,
}

/// `data.list`: every item of the caller matching the optional filters.
pub struct ListDataHandler {
    context: Arc<HandlerContext>,
}

impl ListDataHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for ListDataHandler {
    async fn call(&self, ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let caller = ctx.caller()?;
        let params: ListDataParams = parse_params(params)?;

        let filter = ListFilter {
            id: non_empty(params.id),
            ids: params.ids,
            owner_id: None,
            owner_ids: None,
            item_type: parse_type(&params.item_type)?,
            meta: non_empty(params.meta),
            url: non_empty(params.url),
            created_before: params.created_before,
            created_after: params.created_after,
            updated_before: params.updated_before,
            updated_after: params.updated_after,
        };
        let items = self
            .context
            .vault
            .engine
            .list(&scope_list(caller, filter))
            .await?;

        Ok(json!({ "items": items }))
    }
}

#[derive(Debug, Deserialize)]
struct CreateItem {
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    item_type: String,
    #[serde(default, with = "b64")]
    data: Vec<u8>,
    #[serde(default)]
    meta: String,
}

#[derive(Debug, Deserialize)]
struct CreateDataParams {
    item: CreateItem,
}

/// `data.create`: store a new item owned by the caller.
pub struct CreateDataHandler {
    context: Arc<HandlerContext>,
}

impl CreateDataHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for CreateDataHandler {
    async fn call(&self, ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let caller = ctx.caller()?;
        let CreateDataParams { item } = parse_params(params)?;

        let item_type = parse_type(&item.item_type)?
            .ok_or_else(|| GatewayError::InvalidParams("item type is required".to_string()))?;
        let id = if item.id.is_empty() {
            id::uuid()
        } else {
            item.id
        };

        let new_item = NewDataItem::new(id, String::new(), item_type, item.data).with_meta(item.meta);
        let created = self
            .context
            .vault
            .engine
            .create(scope_new_item(caller, new_item))
            .await?;

        Ok(json!({
            "message": format!("item {} created", created.id),
            "id": created.id,
        }))
    }
}

#[derive(Debug, Deserialize)]
struct UpdateItem {
    #[serde(default)]
    id: String,
    #[serde(default, rename = "type")]
    item_type: String,
    #[serde(default, with = "b64::option")]
    data: Option<Vec<u8>>,
    #[serde(default)]
    meta: String,
}

#[derive(Debug, Deserialize)]
struct UpdateDataParams {
    item: UpdateItem,
}

/// `data.update`: partial update. Empty `type`/`meta` and absent `data`
/// leave the stored values alone.
pub struct UpdateDataHandler {
    context: Arc<HandlerContext>,
}

impl UpdateDataHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for UpdateDataHandler {
    async fn call(&self, ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let caller = ctx.caller()?;
        let UpdateDataParams { item } = parse_params(params)?;

        if item.id.is_empty() {
            return Err(GatewayError::InvalidParams("item id is required".to_string()));
        }

        let mut patch = DataItemPatch::new();
        if let Some(item_type) = parse_type(&item.item_type)? {
            patch = patch.item_type(item_type);
        }
        if let Some(data) = item.data {
            patch = patch.data(data);
        }
        if !item.meta.is_empty() {
            patch = patch.meta(item.meta);
        }

        let filter = scope_filter(caller, ItemFilter::by_id(item.id.clone()));
        self.context
            .vault
            .engine
            .update(&filter, scope_patch(patch))
            .await?;

        Ok(json!({ "message": format!("item {} updated", item.id) }))
    }
}

#[derive(Debug, Default, Deserialize)]
struct DeleteDataParams {
    #[serde(default)]
    id: String,
}

/// `data.delete`: remove one item of the caller.
pub struct DeleteDataHandler {
    context: Arc<HandlerContext>,
}

impl DeleteDataHandler {
    pub fn new(context: Arc<HandlerContext>) -> Self {
        Self { context }
    }
}

#[async_trait]
impl MethodHandler for DeleteDataHandler {
    async fn call(&self, ctx: &CallContext, params: Option<Value>) -> Result<Value> {
        let caller = ctx.caller()?;
        let params: DeleteDataParams = parse_params(params)?;

        if params.id.is_empty() {
            return Err(GatewayError::InvalidParams("item id is required".to_string()));
        }

        let filter = scope_filter(caller, ItemFilter::by_id(params.id.clone()));
        self.context.vault.engine.delete(&filter).await?;

        Ok(json!({ "message": format!("item {} deleted", params.id) }))
    }
}
