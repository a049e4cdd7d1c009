use async_trait::async_trait;
use convodeck_core::{KeyValueStore, KvError};
use sqlx::{sqlite::SqlitePoolOptions, Row, SqlitePool};
use std::path::Path;
use tracing::info;

/// [`KeyValueStore`] over a single SQLite table.
pub struct SqliteKvStore {
    pool: SqlitePool,
}

fn backend(context: &str, e: sqlx::Error) -> KvError {
    KvError::Backend(format!("sqlite {context}: {e}"))
}

impl SqliteKvStore {
    pub async fn open_file(path: impl AsRef<Path>) -> Result<Self, KvError> {
        let url = format!("sqlite://{}?mode=rwc", path.as_ref().to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await
            .map_err(|e| backend("connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        info!(path = %path.as_ref().display(), "opened sqlite store");
        Ok(store)
    }

    pub async fn open_memory() -> Result<Self, KvError> {
        // One connection: every new in-memory connection is a fresh database.
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .map_err(|e| backend("connect", e))?;
        let store = Self { pool };
        store.ensure_schema().await?;
        Ok(store)
    }

    async fn ensure_schema(&self) -> Result<(), KvError> {
        const STMT: &str = r#"
        CREATE TABLE IF NOT EXISTS kv (
          key         TEXT PRIMARY KEY,
          value       TEXT NOT NULL,
          updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
        )
        "#;
        sqlx::query(STMT)
            .execute(&self.pool)
            .await
            .map_err(|e| backend("schema", e))?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for SqliteKvStore {
    async fn get(&self, key: &str) -> Result<Option<String>, KvError> {
        let row = sqlx::query("SELECT value FROM kv WHERE key=?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| backend("read", e))?;
        Ok(row.map(|r| r.get::<String, _>("value")))
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), KvError> {
        sqlx::query(
            "INSERT INTO kv (key,value,updated_at) VALUES (?,?,strftime('%Y-%m-%dT%H:%M:%fZ','now')) \
             ON CONFLICT(key) DO UPDATE SET value=excluded.value, updated_at=excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await
        .map_err(|e| backend("write", e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), KvError> {
        sqlx::query("DELETE FROM kv WHERE key=?")
            .bind(key)
            .execute(&self.pool)
            .await
            .map_err(|e| backend("delete", e))?;
        Ok(())
    }

    async fn get_all_keys(&self) -> Result<Vec<String>, KvError> {
        let rows = sqlx::query("SELECT key FROM kv ORDER BY key ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| backend("list keys", e))?;
        Ok(rows.into_iter().map(|r| r.get::<String, _>("key")).collect())
    }

    async fn multi_get(&self, keys: &[String]) -> Result<Vec<(String, Option<String>)>, KvError> {
        let mut out = Vec::with_capacity(keys.len());
        for key in keys {
            let value = self.get(key).await?;
            out.push((key.clone(), value));
        }
        Ok(out)
    }
}
