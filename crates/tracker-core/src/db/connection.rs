//! Database connection management

use crate::error::Result;
use libsql::{params, Builder, Connection, Database as LibSqlDatabase};
use serde_json::Value;
use std::path::Path;

use super::key_value::KeyValueStore;
use super::migrations;

/// Database wrapper for libSQL connections
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open a local database at the given path, creating it if it doesn't exist
    ///
    /// Runs migrations automatically.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path_str = path.as_ref().to_string_lossy().to_string();
        Self::open_local(&path_str).await
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Self::open_local(":memory:").await
    }

    async fn open_local(path: &str) -> Result<Self> {
        let db = Builder::new_local(path).build().await?;
        let conn = db.connect()?;

        let database = Self { _db: db, conn };
        database.configure().await?;
        database.migrate().await?;
        tracing::debug!("Opened tracker database at {path}");
        Ok(database)
    }

    /// Configure `SQLite` for optimal performance
    async fn configure(&self) -> Result<()> {
        // WAL is unavailable for in-memory databases
        self.conn
            .execute("PRAGMA journal_mode = WAL;", ())
            .await
            .ok();
        self.conn
            .execute("PRAGMA synchronous = NORMAL;", ())
            .await
            .ok();
        Ok(())
    }

    /// Run database migrations
    async fn migrate(&self) -> Result<()> {
        migrations::run(&self.conn).await
    }

    /// Get a reference to the underlying connection
    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}

impl KeyValueStore for Database {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let mut rows = self
            .conn
            .query("SELECT value FROM kv WHERE key = ?1", params![key])
            .await?;

        let Some(row) = rows.next().await? else {
            return Ok(None);
        };
        let raw: String = row.get(0)?;
        Ok(Some(serde_json::from_str(&raw)?))
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let raw = serde_json::to_string(&value)?;
        let now = crate::util::now_millis();
        self.conn
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES (?1, ?2, ?3)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
                params![key, raw, now],
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    #[tokio::test(flavor = "multi_thread")]
    async fn test_open_in_memory() {
        let db = Database::open_in_memory().await.unwrap();
        assert_eq!(db.get("missing").await.unwrap(), None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_set_overwrites_value() {
        let db = Database::open_in_memory().await.unwrap();
        db.set("options", json!({ "autosync_mins": 10 }))
            .await
            .unwrap();
        db.set("options", json!({ "autosync_mins": 15 }))
            .await
            .unwrap();

        assert_eq!(
            db.get("options").await.unwrap(),
            Some(json!({ "autosync_mins": 15 }))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_values_survive_reopen() {
        let tmp = tempdir().unwrap();
        let db_path = tmp.path().join("tracker.db");

        {
            let db = Database::open(&db_path).await.unwrap();
            db.set("outbox", json!([{ "op": "delete", "id": "1" }]))
                .await
                .unwrap();
        }

        let db = Database::open(&db_path).await.unwrap();
        assert_eq!(
            db.get("outbox").await.unwrap(),
            Some(json!([{ "op": "delete", "id": "1" }]))
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_corrupt_value_is_an_error() {
        let db = Database::open_in_memory().await.unwrap();
        db.connection()
            .execute(
                "INSERT INTO kv (key, value, updated_at) VALUES ('items', 'not json', 0)",
                (),
            )
            .await
            .unwrap();

        let error = db.get("items").await.unwrap_err();
        assert!(error.is_storage());
    }
}
