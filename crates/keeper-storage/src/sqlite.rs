//! SQLite connection pool and schema.

use keeper_core::config::DatabaseConfig;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;
use tracing::debug;

use crate::error::Result;

/// Tables for user accounts and data item rows.
///
/// Timestamps are unix milliseconds.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS users (
    user_id       TEXT PRIMARY KEY,
    username      TEXT NOT NULL UNIQUE,
    password_hash TEXT NOT NULL,
    created_at    INTEGER NOT NULL,
    updated_at    INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS data_items (
    id         TEXT PRIMARY KEY,
    owner_id   TEXT NOT NULL,
    item_type  TEXT NOT NULL,
    data       BLOB NOT NULL DEFAULT x'',
    meta       TEXT NOT NULL DEFAULT '',
    url        TEXT NOT NULL DEFAULT '',
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_data_items_owner ON data_items(owner_id);
CREATE INDEX IF NOT EXISTS idx_data_items_created ON data_items(created_at, id);
"#;

fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:") || url.contains("mode=memory")
}

/// File path named by a `sqlite:` URL, if it names one.
fn file_path(url: &str) -> Option<&Path> {
    if is_memory_url(url) {
        return None;
    }
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    (!path.is_empty()).then(|| Path::new(path))
}

/// Open a connection pool, creating the database file and its directory if missing.
pub async fn open_pool(url: &str, config: &DatabaseConfig) -> Result<SqlitePool> {
    if let Some(parent) = file_path(url).and_then(Path::parent) {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let opts = SqliteConnectOptions::from_str(url)?
        .create_if_missing(true)
        .journal_mode(SqliteJournalMode::Wal)
        .synchronous(SqliteSynchronous::Normal)
        .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

    // every connection to `:memory:` is a separate database
    let pool = if is_memory_url(url) {
        SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?
    } else {
        SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .connect_with(opts)
            .await?
    };

    debug!(url, "opened sqlite pool");
    Ok(pool)
}

/// Create tables and indexes if they do not already exist.
pub async fn migrate(pool: &SqlitePool) -> Result<()> {
    for statement in SCHEMA_SQL
        .split(';')
        .map(str::trim)
        .filter(|s| !s.is_empty())
    {
        sqlx::query(statement).execute(pool).await?;
    }
    Ok(())
}

/// In-memory database with the schema applied.
pub async fn memory_pool() -> Result<SqlitePool> {
    let pool = open_pool("sqlite::memory:", &DatabaseConfig::default()).await?;
    migrate(&pool).await?;
    Ok(pool)
}
