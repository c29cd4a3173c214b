// JobHarvest Infrastructure - HTTP Adapters
// Implements: IngestionClient (REST API), RenderingEngine (static HTML)

mod ingestion;
mod rendering;

pub use ingestion::{HttpIngestionClient, IngestionClientConfig};
pub use rendering::{StaticRenderingEngine, STATIC_ENGINE};

use jobharvest_core::error::AppError;

/// User-Agent sent on every outbound request
pub fn user_agent() -> String {
    format!("jobharvest-worker/{}", jobharvest_core::VERSION)
}

pub(crate) fn map_reqwest_error(context: &str, err: reqwest::Error) -> AppError {
    match err.status() {
        Some(status) => AppError::Transport(format!("{context}: HTTP {status}")),
        None if err.is_timeout() => AppError::Transport(format!("{context}: request timed out")),
        None => AppError::Transport(format!("{context}: {err}")),
    }
}
