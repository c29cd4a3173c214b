//! Scrape Service - drives exactly one adapter run to completion
//!
//! Flow: resolve adapter -> fresh limiter + deduper -> open one rendering
//! session -> drain the adapter stream through the deduper -> close the
//! session -> submit the novel batch (if any) -> `ScrapeRunResult`.

use crate::application::adapter::{AdapterContext, AdapterRegistry, SiteAdapter};
use crate::application::dedupe::Deduper;
use crate::application::rate_limiter::RateLimiter;
use crate::domain::{NormalizedJob, ScrapeRunResult};
use crate::error::Result;
use crate::port::{IdProvider, IngestionClient, KeyValueStore, RenderingEngine, RenderingSession};
use futures::StreamExt;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Rendering engine used when none is configured
pub const DEFAULT_RENDER_ENGINE: &str = "static";

/// Run-level configuration
#[derive(Debug, Clone)]
pub struct ScrapeConfig {
    /// Engine name passed to `RenderingEngine::open`
    pub render_engine: String,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            render_engine: DEFAULT_RENDER_ENGINE.to_string(),
        }
    }
}

#[derive(Default)]
struct RunTally {
    processed: u64,
    dropped: u64,
    batch: Vec<NormalizedJob>,
}

/// Run orchestrator
pub struct ScrapeService {
    registry: Arc<AdapterRegistry>,
    store: Arc<dyn KeyValueStore>,
    ingestion: Arc<dyn IngestionClient>,
    engine: Arc<dyn RenderingEngine>,
    id_provider: Arc<dyn IdProvider>,
    config: ScrapeConfig,
}

impl ScrapeService {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        store: Arc<dyn KeyValueStore>,
        ingestion: Arc<dyn IngestionClient>,
        engine: Arc<dyn RenderingEngine>,
        id_provider: Arc<dyn IdProvider>,
        config: ScrapeConfig,
    ) -> Self {
        Self {
            registry,
            store,
            ingestion,
            engine,
            id_provider,
            config,
        }
    }

    /// Run one scrape for `adapter_slug`
    ///
    /// # Errors
    /// - `AppError::UnknownAdapter` for an unregistered slug
    /// - `AppError::Config` for an unsupported rendering engine or a zero
    ///   dedupe TTL
    /// - Adapter, store and ingestion errors propagate unchanged. Dedupe
    ///   markers written before the failure stay in place.
    pub async fn run_adapter(
        &self,
        adapter_slug: &str,
        run_id: Option<String>,
    ) -> Result<ScrapeRunResult> {
        let adapter = self.registry.get(adapter_slug)?;
        let slug = adapter.slug().to_string();

        let limiter = Arc::new(RateLimiter::per_minute(adapter.rate_limit_per_minute()));
        let deduper =
            Deduper::for_adapter(Arc::clone(&self.store), &slug, adapter.dedupe_ttl_seconds())?;
        let ctx = AdapterContext::new(limiter, slug.clone(), self.config.render_engine.clone());
        let run_id = run_id.unwrap_or_else(|| self.id_provider.generate_id());

        info!(
            adapter = %slug,
            run_id = %run_id,
            engine = %ctx.engine_name(),
            "Starting scrape run"
        );

        let mut session = self.engine.open(ctx.engine_name()).await?;
        let outcome = Self::drain(adapter.as_ref(), &ctx, &deduper, session.as_mut()).await;

        // Close regardless of how iteration ended
        if let Err(e) = session.close().await {
            warn!(adapter = %slug, run_id = %run_id, error = %e, "Failed to close rendering session");
        }

        let tally = match outcome {
            Ok(tally) => tally,
            Err(e) => {
                error!(adapter = %slug, run_id = %run_id, error = %e, "Scrape run aborted");
                return Err(e);
            }
        };

        let sent = tally.batch.len() as u64;
        let ingestion_response = if tally.batch.is_empty() {
            None
        } else {
            Some(self.ingestion.submit(&slug, &run_id, &tally.batch).await?)
        };

        info!(
            adapter = %slug,
            run_id = %run_id,
            processed = tally.processed,
            sent = sent,
            dropped = tally.dropped,
            "Scrape run complete"
        );

        Ok(ScrapeRunResult {
            adapter: slug,
            run_id,
            processed: tally.processed,
            sent,
            dropped: tally.dropped,
            ingestion_response,
        })
    }

    /// Pull every item in yield order, stamping `source` and filtering duplicates
    async fn drain(
        adapter: &dyn SiteAdapter,
        ctx: &AdapterContext,
        deduper: &Deduper,
        session: &mut dyn RenderingSession,
    ) -> Result<RunTally> {
        let mut tally = RunTally::default();
        let mut jobs = adapter.scrape(ctx, session);

        while let Some(item) = jobs.next().await {
            let mut job = item?;
            tally.processed += 1;
            job.source = Some(adapter.slug().to_string());

            let fingerprint = adapter.dedupe_key(&job);
            if deduper.is_duplicate(&fingerprint).await? {
                tally.dropped += 1;
                continue;
            }
            tally.batch.push(job);
        }

        Ok(tally)
    }
}
