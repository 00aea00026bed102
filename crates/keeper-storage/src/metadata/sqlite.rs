//! SQLite-backed metadata store.

use async_trait::async_trait;
use keeper_core::types::{
    non_empty, DataItem, DataItemPatch, ItemFilter, ListFilter, NewDataItem,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{Executor, QueryBuilder, Row, Sqlite, SqlitePool, Transaction};
use tracing::debug;

use super::{require_valid, MetadataStore, MetadataTx};
use crate::error::{Result, StorageError};
use crate::{from_millis, now};

const COLUMNS: &str = "id, owner_id, item_type, data, meta, url, created_at, updated_at";

/// Metadata store over a SQLite pool.
#[derive(Clone)]
pub struct SqliteMetadataStore {
    pool: SqlitePool,
}

impl SqliteMetadataStore {
    /// Wrap a pool whose schema has already been migrated.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

/// A transaction on the data item table.
pub struct SqliteMetadataTx {
    tx: Transaction<'static, Sqlite>,
}

fn push_item_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ItemFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = non_empty(&filter.id) {
        qb.push(" AND id = ").push_bind(id.to_string());
    }
    if let Some(owner_id) = non_empty(&filter.owner_id) {
        qb.push(" AND owner_id = ").push_bind(owner_id.to_string());
    }
    if let Some(item_type) = filter.item_type {
        qb.push(" AND item_type = ").push_bind(item_type.as_str());
    }
    if let Some(meta) = non_empty(&filter.meta) {
        qb.push(" AND meta = ").push_bind(meta.to_string());
    }
    if let Some(url) = non_empty(&filter.url) {
        qb.push(" AND url = ").push_bind(url.to_string());
    }
}

fn push_in(qb: &mut QueryBuilder<'_, Sqlite>, column: &str, values: &[String]) {
    if values.is_empty() {
        qb.push(" AND 0");
        return;
    }
    qb.push(format!(" AND {column} IN ("));
    let mut list = qb.separated(", ");
    for value in values {
        list.push_bind(value.clone());
    }
    list.push_unseparated(")");
}

fn push_list_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ListFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(id) = non_empty(&filter.id) {
        qb.push(" AND id = ").push_bind(id.to_string());
    }
    if let Some(ids) = &filter.ids {
        push_in(qb, "id", ids);
    }
    if let Some(owner_id) = non_empty(&filter.owner_id) {
        qb.push(" AND owner_id = ").push_bind(owner_id.to_string());
    }
    if let Some(owner_ids) = &filter.owner_ids {
        push_in(qb, "owner_id", owner_ids);
    }
    if let Some(item_type) = filter.item_type {
        qb.push(" AND item_type = ").push_bind(item_type.as_str());
    }
    if let Some(meta) = non_empty(&filter.meta) {
        qb.push(" AND meta = ").push_bind(meta.to_string());
    }
    if let Some(url) = non_empty(&filter.url) {
        qb.push(" AND url = ").push_bind(url.to_string());
    }
    if let Some(t) = filter.created_before {
        qb.push(" AND created_at <= ").push_bind(t.timestamp_millis());
    }
    if let Some(t) = filter.created_after {
        qb.push(" AND created_at >= ").push_bind(t.timestamp_millis());
    }
    if let Some(t) = filter.updated_before {
        qb.push(" AND updated_at <= ").push_bind(t.timestamp_millis());
    }
    if let Some(t) = filter.updated_after {
        qb.push(" AND updated_at >= ").push_bind(t.timestamp_millis());
    }
}

fn item_from_row(row: &SqliteRow) -> Result<DataItem> {
    let item_type: String = row.try_get("item_type")?;
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;
    Ok(DataItem {
        id: row.try_get("id")?,
        owner_id: row.try_get("owner_id")?,
        item_type: item_type
            .parse()
            .map_err(|e: keeper_core::Error| StorageError::Serialization(e.to_string()))?,
        data: row.try_get("data")?,
        meta: row.try_get("meta")?,
        url: row.try_get("url")?,
        created_at: from_millis(created_at)
            .ok_or_else(|| StorageError::Serialization(format!("bad created_at {created_at}")))?,
        updated_at: from_millis(updated_at)
            .ok_or_else(|| StorageError::Serialization(format!("bad updated_at {updated_at}")))?,
    })
}

async fn fetch_one<'e, E>(exec: E, filter: &ItemFilter) -> Result<Option<DataItem>>
where
    E: Executor<'e, Database = Sqlite>,
{
    require_valid(filter)?;
    let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM data_items"));
    push_item_where(&mut qb, filter);
    qb.push(" ORDER BY created_at, id LIMIT 1");
    let row = qb.build().fetch_optional(exec).await?;
    row.as_ref().map(item_from_row).transpose()
}

async fn insert<'e, E>(exec: E, item: NewDataItem) -> Result<DataItem>
where
    E: Executor<'e, Database = Sqlite>,
{
    let row = item.into_row(now());
    sqlx::query(
        "INSERT INTO data_items (id, owner_id, item_type, data, meta, url, created_at, updated_at) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&row.id)
    .bind(&row.owner_id)
    .bind(row.item_type.as_str())
    .bind(&row.data)
    .bind(&row.meta)
    .bind(&row.url)
    .bind(row.created_at.timestamp_millis())
    .bind(row.updated_at.timestamp_millis())
    .execute(exec)
    .await
    .map_err(|e| StorageError::from_insert(e, &row.id))?;
    debug!(id = %row.id, item_type = %row.item_type, "inserted data item");
    Ok(row)
}

async fn apply_patch<'e, E>(exec: E, filter: &ItemFilter, patch: &DataItemPatch) -> Result<u64>
where
    E: Executor<'e, Database = Sqlite>,
{
    require_valid(filter)?;
    if patch.is_empty() {
        return Ok(0);
    }

    let mut qb = QueryBuilder::<Sqlite>::new("UPDATE data_items SET ");
    {
        let mut set = qb.separated(", ");
        if let Some(owner_id) = &patch.owner_id {
            set.push("owner_id = ").push_bind_unseparated(owner_id.clone());
        }
        if let Some(item_type) = patch.item_type {
            set.push("item_type = ").push_bind_unseparated(item_type.as_str());
        }
        if let Some(data) = &patch.data {
            set.push("data = ").push_bind_unseparated(data.clone());
        }
        if let Some(meta) = &patch.meta {
            set.push("meta = ").push_bind_unseparated(meta.clone());
        }
        if let Some(url) = &patch.url {
            set.push("url = ").push_bind_unseparated(url.clone());
        }
        set.push("updated_at = ")
            .push_bind_unseparated(now().timestamp_millis());
    }
    push_item_where(&mut qb, filter);

    let result = qb.build().execute(exec).await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl MetadataStore for SqliteMetadataStore {
    async fn get(&self, filter: &ItemFilter) -> Result<Option<DataItem>> {
        fetch_one(&self.pool, filter).await
    }

    async fn list(&self, filter: &ListFilter) -> Result<Vec<DataItem>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM data_items"));
        push_list_where(&mut qb, filter);
        qb.push(" ORDER BY created_at, id");
        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(item_from_row).collect()
    }

    async fn create(&self, item: NewDataItem) -> Result<DataItem> {
        insert(&self.pool, item).await
    }

    async fn update(&self, filter: &ItemFilter, patch: &DataItemPatch) -> Result<u64> {
        apply_patch(&self.pool, filter, patch).await
    }

    async fn delete(&self, filter: &ItemFilter) -> Result<u64> {
        require_valid(filter)?;
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM data_items");
        push_item_where(&mut qb, filter);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn begin(&self) -> Result<Box<dyn MetadataTx>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(SqliteMetadataTx { tx }))
    }
}

#[async_trait]
impl MetadataTx for SqliteMetadataTx {
    async fn get(&mut self, filter: &ItemFilter) -> Result<Option<DataItem>> {
        fetch_one(&mut *self.tx, filter).await
    }

    async fn create(&mut self, item: NewDataItem) -> Result<DataItem> {
        insert(&mut *self.tx, item).await
    }

    async fn update(&mut self, filter: &ItemFilter, patch: &DataItemPatch) -> Result<u64> {
        apply_patch(&mut *self.tx, filter, patch).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
