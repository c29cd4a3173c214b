// Store Maintenance port
use crate::error::Result;
use async_trait::async_trait;

/// Housekeeping for stores that do not expire keys natively
#[async_trait]
pub trait StoreMaintenance: Send + Sync {
    /// Delete entries whose TTL has elapsed
    ///
    /// # Returns
    /// Number of entries removed
    async fn purge_expired(&self) -> Result<u64>;
}
