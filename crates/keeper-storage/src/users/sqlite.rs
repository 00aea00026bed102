//! SQLite-backed user store.

use async_trait::async_trait;
use keeper_core::types::{
    non_empty, NewUserAccount, UserAccount, UserFilter, UserListFilter, UserPatch,
};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqlitePool};
use tracing::debug;

use super::{require_valid, UserStore};
use crate::error::{Result, StorageError};
use crate::{from_millis, now};

const COLUMNS: &str = "user_id, username, password_hash, created_at, updated_at";

/// User store over a SQLite pool.
#[derive(Clone)]
pub struct SqliteUserStore {
    pool: SqlitePool,
}

impl SqliteUserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn push_user_where(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    qb.push(" WHERE 1 = 1");
    if let Some(user_id) = non_empty(&filter.user_id) {
        qb.push(" AND user_id = ").push_bind(user_id.to_string());
    }
    if let Some(username) = non_empty(&filter.username) {
        qb.push(" AND username = ").push_bind(username.to_string());
    }
}

fn user_from_row(row: &SqliteRow) -> Result<UserAccount> {
    let created_at: i64 = row.try_get("created_at")?;
    let updated_at: i64 = row.try_get("updated_at")?;
    Ok(UserAccount {
        user_id: row.try_get("user_id")?,
        username: row.try_get("username")?,
        password_hash: row.try_get("password_hash")?,
        created_at: from_millis(created_at)
            .ok_or_else(|| StorageError::Serialization(format!("bad created_at {created_at}")))?,
        updated_at: from_millis(updated_at)
            .ok_or_else(|| StorageError::Serialization(format!("bad updated_at {updated_at}")))?,
    })
}

#[async_trait]
impl UserStore for SqliteUserStore {
    async fn get(&self, filter: &UserFilter) -> Result<Option<UserAccount>> {
        require_valid(filter)?;
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM users"));
        push_user_where(&mut qb, filter);
        qb.push(" LIMIT 1");
        let row = qb.build().fetch_optional(&self.pool).await?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list(&self, filter: &UserListFilter) -> Result<Vec<UserAccount>> {
        let mut qb = QueryBuilder::<Sqlite>::new(format!("SELECT {COLUMNS} FROM users WHERE 1 = 1"));
        if let Some(user_id) = non_empty(&filter.user_id) {
            qb.push(" AND user_id = ").push_bind(user_id.to_string());
        }
        if let Some(user_ids) = &filter.user_ids {
            if user_ids.is_empty() {
                qb.push(" AND 0");
            } else {
                qb.push(" AND user_id IN (");
                let mut list = qb.separated(", ");
                for id in user_ids {
                    list.push_bind(id.clone());
                }
                list.push_unseparated(")");
            }
        }
        if let Some(username) = non_empty(&filter.username) {
            qb.push(" AND username = ").push_bind(username.to_string());
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
        qb.push(" ORDER BY created_at, user_id");

        let rows = qb.build().fetch_all(&self.pool).await?;
        rows.iter().map(user_from_row).collect()
    }

    async fn create(&self, user: NewUserAccount) -> Result<UserAccount> {
        let row = user.into_row(now());
        sqlx::query(
            "INSERT INTO users (user_id, username, password_hash, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&row.user_id)
        .bind(&row.username)
        .bind(&row.password_hash)
        .bind(row.created_at.timestamp_millis())
        .bind(row.updated_at.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::from_insert(e, &row.username))?;
        debug!(user_id = %row.user_id, "inserted user");
        Ok(row)
    }

    async fn update(&self, filter: &UserFilter, patch: &UserPatch) -> Result<u64> {
        require_valid(filter)?;
        if patch.is_empty() {
            return Ok(0);
        }

        let mut qb = QueryBuilder::<Sqlite>::new("UPDATE users SET ");
        {
            let mut set = qb.separated(", ");
            if let Some(username) = &patch.username {
                set.push("username = ").push_bind_unseparated(username.clone());
            }
            if let Some(hash) = &patch.password_hash {
                set.push("password_hash = ").push_bind_unseparated(hash.clone());
            }
            set.push("updated_at = ")
                .push_bind_unseparated(now().timestamp_millis());
        }
        push_user_where(&mut qb, filter);

        let result = qb
            .build()
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::from_insert(e, patch.username.as_deref().unwrap_or("")))?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, filter: &UserFilter) -> Result<u64> {
        require_valid(filter)?;
        let mut qb = QueryBuilder::<Sqlite>::new("DELETE FROM users");
        push_user_where(&mut qb, filter);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}
