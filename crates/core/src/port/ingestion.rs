// Ingestion API Port

use crate::domain::{NormalizedJob, ScrapeScheduleEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Downstream ingestion API.
///
/// Implementations must return `AppError::Transport` on transport failure or
/// error status. The core never retries these calls.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IngestionClient: Send + Sync {
    /// Push one batch of novel jobs for a run
    async fn submit(
        &self,
        adapter: &str,
        run_id: &str,
        jobs: &[NormalizedJob],
    ) -> Result<serde_json::Value>;

    /// Fetch current cadence configuration
    async fn fetch_cadence(&self) -> Result<Vec<ScrapeScheduleEntry>>;
}
