// Application Layer - Scrape orchestration use cases

pub mod adapter;
pub mod dedupe;
pub mod dispatch_loop;
pub mod dispatcher;
pub mod rate_limiter;
pub mod scrape_service;
pub mod worker;

// Re-exports
pub use adapter::{AdapterContext, AdapterRegistry, JobStream, SiteAdapter};
pub use dedupe::Deduper;
pub use dispatch_loop::DispatchLoop;
pub use dispatcher::{DispatchConfig, ScheduleDispatcher};
pub use rate_limiter::RateLimiter;
pub use scrape_service::{ScrapeConfig, ScrapeService};
pub use worker::{shutdown_channel, ShutdownSender, ShutdownToken, Worker};
