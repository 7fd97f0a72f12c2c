//! SQLite implementation of IKeyValueStore
//!
//! | Column       | SQL Type | Content                     |
//! |--------------|----------|-----------------------------|
//! | `key`        | TEXT     | Fixed document name         |
//! | `value`      | TEXT     | JSON document               |
//! | `version`    | INTEGER  | Write version               |
//! | `updated_at` | TEXT     | RFC 3339 time of last write |
//!
//! Versions are seeded from the clock in microseconds and always move
//! forward, so a key that is deleted and written again never comes back at a
//! version an earlier reader saw.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use lexsync_core::ports::{IKeyValueStore, Versioned};

/// Key-value store over the `kv_entries` table
pub struct SqliteKeyValueStore {
    pool: SqlitePool,
}

impl SqliteKeyValueStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl IKeyValueStore for SqliteKeyValueStore {
    async fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| r.get("value")))
    }

    async fn get_versioned(&self, key: &str) -> anyhow::Result<Option<Versioned>> {
        let row = sqlx::query("SELECT value, version FROM kv_entries WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| Versioned {
            value: r.get("value"),
            version: r.get("version"),
        }))
    }

    async fn put(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let now = Utc::now();

        sqlx::query(
            "INSERT INTO kv_entries (key, value, version, updated_at) VALUES (?, ?, ?, ?) \
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, \
             version = MAX(kv_entries.version + 1, excluded.version), \
             updated_at = excluded.updated_at",
        )
        .bind(key)
        .bind(value)
        .bind(now.timestamp_micros())
        .bind(now.to_rfc3339())
        .execute(&self.pool)
        .await?;

        tracing::trace!(key, bytes = value.len(), "Stored entry");
        Ok(())
    }

    async fn put_if_version(
        &self,
        key: &str,
        value: &str,
        expected: Option<i64>,
    ) -> anyhow::Result<Option<i64>> {
        let now = Utc::now();
        let clock = now.timestamp_micros();

        let (version, affected) = match expected {
            None => {
                let result = sqlx::query(
                    "INSERT INTO kv_entries (key, value, version, updated_at) VALUES (?, ?, ?, ?) \
                     ON CONFLICT(key) DO NOTHING",
                )
                .bind(key)
                .bind(value)
                .bind(clock)
                .bind(now.to_rfc3339())
                .execute(&self.pool)
                .await?;
                (clock, result.rows_affected())
            }
            Some(current) => {
                let next = clock.max(current + 1);
                let result = sqlx::query(
                    "UPDATE kv_entries SET value = ?, version = ?, updated_at = ? \
                     WHERE key = ? AND version = ?",
                )
                .bind(value)
                .bind(next)
                .bind(now.to_rfc3339())
                .bind(key)
                .bind(current)
                .execute(&self.pool)
                .await?;
                (next, result.rows_affected())
            }
        };
        let written = (affected == 1).then_some(version);

        match written {
            Some(version) => tracing::trace!(key, version, "Stored entry"),
            None => tracing::debug!(key, ?expected, "Entry changed by another writer"),
        }
        Ok(written)
    }

    async fn delete(&self, key: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM kv_entries WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;

        tracing::trace!(key, "Deleted entry");
        Ok(())
    }
}
