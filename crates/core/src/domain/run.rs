// Scrape Run Result

use serde::{Deserialize, Serialize};

/// Summary of one orchestration pass, built once at the end of a run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapeRunResult {
    pub adapter: String,
    pub run_id: String,
    /// Items yielded by the adapter
    pub processed: u64,
    /// Items forwarded to ingestion
    pub sent: u64,
    /// Items rejected as duplicates
    pub dropped: u64,
    /// Raw ingestion response; `None` when nothing was sent
    pub ingestion_response: Option<serde_json::Value>,
}
