// JobHarvest Infrastructure - Redis Adapter
// Implements: KeyValueStore (keys expire natively, no housekeeping needed)

use async_trait::async_trait;
use jobharvest_core::error::{AppError, Result};
use jobharvest_core::port::KeyValueStore;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

/// Shared store over a multiplexed, auto-reconnecting Redis connection
#[derive(Clone)]
pub struct RedisStore {
    conn: ConnectionManager,
}

impl fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisStore")
            .field("connection", &"ConnectionManager")
            .finish()
    }
}

impl RedisStore {
    pub async fn connect(redis_url: &str) -> Result<Self> {
        info!(url = %redis_url, "Connecting to Redis");

        let client = redis::Client::open(redis_url)
            .map_err(|e| AppError::Config(format!("Invalid Redis URL: {e}")))?;

        let conn = ConnectionManager::new(client)
            .await
            .map_err(|e| map_redis_error("connect", e))?;

        Ok(Self { conn })
    }
}

fn map_redis_error(op: &str, err: redis::RedisError) -> AppError {
    AppError::Storage(format!("Redis {op} failed: {err}"))
}

/// Redis EX takes whole seconds and rejects zero
fn ttl_seconds(ttl: Duration) -> u64 {
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1)
}

#[async_trait]
impl KeyValueStore for RedisStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();

        // SET NX replies OK when written, nil when the key already exists
        let reply: Option<String> = redis::cmd("SET")
            .arg(key)
            .arg(value)
            .arg("NX")
            .arg("EX")
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("SET NX", e))?;

        debug!(key = %key, written = reply.is_some(), "Redis SET NX");
        Ok(reply.is_some())
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let mut conn = self.conn.clone();
        conn.set_ex::<_, _, ()>(key, value, ttl_seconds(ttl))
            .await
            .map_err(|e| map_redis_error("SETEX", e))
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut conn = self.conn.clone();
        conn.get::<_, Option<String>>(key)
            .await
            .map_err(|e| map_redis_error("GET", e))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let mut conn = self.conn.clone();

        let updated: i64 = redis::cmd("EXPIRE")
            .arg(key)
            .arg(ttl_seconds(ttl))
            .query_async(&mut conn)
            .await
            .map_err(|e| map_redis_error("EXPIRE", e))?;

        Ok(updated == 1)
    }
}
