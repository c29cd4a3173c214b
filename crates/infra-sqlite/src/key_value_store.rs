// SQLite KeyValueStore Implementation
//
// Expiry is stored as epoch ms and compared against the injected clock, so an
// expired row behaves exactly like a missing one until `purge_expired` removes it.

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use jobharvest_core::error::Result;
use jobharvest_core::port::{KeyValueStore, StoreMaintenance, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;

pub struct SqliteStore {
    pool: SqlitePool,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self {
            pool,
            time_provider,
        }
    }

    fn expires_at(&self, now: i64, ttl: Duration) -> i64 {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        now.saturating_add(ttl_ms)
    }
}

#[async_trait]
impl KeyValueStore for SqliteStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let now = self.time_provider.now_millis();

        // Upsert only overwrites a row that has already expired
        let result = sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE
                SET value = excluded.value, expires_at = excluded.expires_at
                WHERE kv_entries.expires_at <= ?
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(self.expires_at(now, ttl))
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let now = self.time_provider.now_millis();

        sqlx::query(
            r#"
            INSERT INTO kv_entries (key, value, expires_at) VALUES (?, ?, ?)
            ON CONFLICT(key) DO UPDATE
                SET value = excluded.value, expires_at = excluded.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(self.expires_at(now, ttl))
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.time_provider.now_millis();

        sqlx::query_scalar("SELECT value FROM kv_entries WHERE key = ? AND expires_at > ?")
            .bind(key)
            .bind(now)
            .fetch_optional(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = self.time_provider.now_millis();

        let result =
            sqlx::query("UPDATE kv_entries SET expires_at = ? WHERE key = ? AND expires_at > ?")
                .bind(self.expires_at(now, ttl))
                .bind(key)
                .bind(now)
                .execute(&self.pool)
                .await
                .map_err(map_sqlx_error)?;

        Ok(result.rows_affected() == 1)
    }
}

#[async_trait]
impl StoreMaintenance for SqliteStore {
    async fn purge_expired(&self) -> Result<u64> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query("DELETE FROM kv_entries WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}
