//! Site Adapter Contract & Registry
//!
//! A site adapter knows how one job board is scraped. It yields a lazy,
//! finite, ordered stream of `NormalizedJob`s; the orchestrator drives the
//! stream and may stop early. Adapters never throttle themselves: they call
//! `AdapterContext::throttle` before each network-bound action.

use crate::application::dedupe::DEFAULT_DEDUPE_TTL_SECONDS;
use crate::application::rate_limiter::RateLimiter;
use crate::domain::NormalizedJob;
use crate::error::{AppError, Result};
use crate::port::RenderingSession;
use futures::stream::BoxStream;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::warn;

/// Default outbound budget when an adapter does not override it
pub const DEFAULT_RATE_LIMIT_PER_MINUTE: u32 = 30;

/// Lazy sequence of scraped jobs; an `Err` item aborts the run
pub type JobStream<'a> = BoxStream<'a, Result<NormalizedJob>>;

/// Shared context handed to an adapter for one run
pub struct AdapterContext {
    rate_limit: Arc<RateLimiter>,
    rate_key: String,
    engine_name: String,
}

impl AdapterContext {
    pub fn new(
        rate_limit: Arc<RateLimiter>,
        rate_key: impl Into<String>,
        engine_name: impl Into<String>,
    ) -> Self {
        Self {
            rate_limit,
            rate_key: rate_key.into(),
            engine_name: engine_name.into(),
        }
    }

    /// Wait until the rate limiter allows another outbound request
    pub async fn throttle(&self) {
        self.rate_limit.acquire(&self.rate_key).await;
    }

    /// Name of the rendering engine the session was opened with
    pub fn engine_name(&self) -> &str {
        &self.engine_name
    }
}

/// Capability interface every job-board scraper implements
pub trait SiteAdapter: Send + Sync {
    /// Stable identifier, also the registry key
    fn slug(&self) -> &str;

    fn display_name(&self) -> &str;

    /// `0` disables throttling
    fn rate_limit_per_minute(&self) -> u32 {
        DEFAULT_RATE_LIMIT_PER_MINUTE
    }

    fn dedupe_ttl_seconds(&self) -> u64 {
        DEFAULT_DEDUPE_TTL_SECONDS
    }

    /// Fingerprint used to deduplicate jobs downstream
    fn dedupe_key(&self, job: &NormalizedJob) -> String {
        job.default_fingerprint().to_string()
    }

    /// Produce this source's jobs. Each call starts a fresh sequence.
    fn scrape<'a>(
        &'a self,
        ctx: &'a AdapterContext,
        session: &'a mut dyn RenderingSession,
    ) -> JobStream<'a>;
}

/// Slug -> adapter mapping
#[derive(Clone, Default)]
pub struct AdapterRegistry {
    adapters: BTreeMap<String, Arc<dyn SiteAdapter>>,
}

impl AdapterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under its slug (replaces an existing one)
    pub fn register(&mut self, adapter: Arc<dyn SiteAdapter>) -> &mut Self {
        let slug = adapter.slug().to_string();
        if self.adapters.insert(slug.clone(), adapter).is_some() {
            warn!(adapter = %slug, "Adapter registered twice, keeping the latest");
        }
        self
    }

    /// Resolve a slug. Unknown slugs are a configuration error.
    pub fn get(&self, slug: &str) -> Result<Arc<dyn SiteAdapter>> {
        self.adapters
            .get(slug)
            .cloned()
            .ok_or_else(|| AppError::UnknownAdapter(slug.to_string()))
    }

    /// Registered slugs in stable (sorted) order
    pub fn slugs(&self) -> impl Iterator<Item = &str> {
        self.adapters.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<dyn SiteAdapter>> {
        self.adapters.values()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl std::fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("adapters", &self.adapters.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedAdapter;

    #[test]
    fn test_unknown_slug_is_configuration_error() {
        let registry = AdapterRegistry::new();
        let err = registry.get("missing-board").err().unwrap();

        assert!(matches!(err, AppError::UnknownAdapter(ref s) if s == "missing-board"));
        assert!(err.is_configuration());
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = AdapterRegistry::new();
        registry
            .register(Arc::new(ScriptedAdapter::new("b-board", vec![])))
            .register(Arc::new(ScriptedAdapter::new("a-board", vec![])));

        assert_eq!(registry.len(), 2);
        assert_eq!(registry.get("a-board").unwrap().slug(), "a-board");
        assert_eq!(registry.slugs().collect::<Vec<_>>(), vec!["a-board", "b-board"]);
    }

    #[test]
    fn test_contract_defaults() {
        let adapter = ScriptedAdapter::new("x", vec![]);
        assert_eq!(adapter.rate_limit_per_minute(), DEFAULT_RATE_LIMIT_PER_MINUTE);
        assert_eq!(adapter.dedupe_ttl_seconds(), DEFAULT_DEDUPE_TTL_SECONDS);

        let job = NormalizedJob::new("", "t", "c", "d", "https://jobs.example/9");
        assert_eq!(adapter.dedupe_key(&job), "https://jobs.example/9");
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_uses_shared_limiter() {
        let limiter = Arc::new(RateLimiter::new(1, std::time::Duration::from_secs(60)));
        let ctx = AdapterContext::new(limiter, "demo-board", "static");
        let start = tokio::time::Instant::now();

        ctx.throttle().await;
        ctx.throttle().await;

        assert!(start.elapsed() >= std::time::Duration::from_secs(60));
        assert_eq!(ctx.engine_name(), "static");
    }
}
