// Shared Key-Value Store Port
//
// Backs dedupe markers and last-dispatch timestamps. Shared across processes,
// so atomic conditional writes are the only correctness primitive we rely on.

use crate::error::Result;
use async_trait::async_trait;
use std::time::Duration;

/// Key-value store with per-key expiry. An expired key behaves as absent.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Atomically set `key` only if it is absent (or expired).
    ///
    /// Returns `true` when the value was written, `false` when the key already
    /// held a live value. Must be a single operation on the backing store.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool>;

    /// Unconditionally set `key` with expiry
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()>;

    /// Read a live value
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Refresh the expiry of a live key. Returns `false` if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
}
