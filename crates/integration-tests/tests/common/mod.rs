//! Shared wiring for the integration suites: SQLite in memory, manual clock,
//! recording ingestion, static rendering over `data:` URLs.

#![allow(dead_code)]

use chrono::{DateTime, TimeZone, Utc};
use jobharvest_adapters::builtin_registry;
use jobharvest_core::application::{
    AdapterRegistry, DispatchConfig, ScheduleDispatcher, ScrapeConfig, ScrapeService, Worker,
};
use jobharvest_core::port::RenderingEngine;
use jobharvest_core::testing::{ManualClock, RecordingIngestion, SequentialIdProvider};
use jobharvest_infra_http::StaticRenderingEngine;
use jobharvest_infra_sqlite::{create_pool, run_migrations, SqliteStore, SqliteTaskQueue};
use std::sync::Arc;
use std::time::Duration;

pub struct Harness {
    pub clock: Arc<ManualClock>,
    pub store: Arc<SqliteStore>,
    pub queue: Arc<SqliteTaskQueue>,
    pub ingestion: Arc<RecordingIngestion>,
    pub registry: Arc<AdapterRegistry>,
}

pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 3, 8, 0, 0).unwrap()
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_ingestion(RecordingIngestion::new()).await
    }

    pub async fn with_ingestion(ingestion: RecordingIngestion) -> Self {
        Self::with_registry(ingestion, builtin_registry()).await
    }

    pub async fn with_registry(ingestion: RecordingIngestion, registry: AdapterRegistry) -> Self {
        let pool = create_pool("sqlite::memory:").await.unwrap();
        run_migrations(&pool).await.unwrap();

        let clock = Arc::new(ManualClock::new(start_time()));
        let store = Arc::new(SqliteStore::new(pool.clone(), clock.clone()));
        let queue = Arc::new(SqliteTaskQueue::new(
            pool,
            Arc::new(SequentialIdProvider::new("task")),
            clock.clone(),
        ));

        Self {
            clock,
            store,
            queue,
            ingestion: Arc::new(ingestion),
            registry: Arc::new(registry),
        }
    }

    pub fn scrape_service(&self) -> Arc<ScrapeService> {
        self.scrape_service_on(Arc::new(
            StaticRenderingEngine::new(Duration::from_secs(5)).unwrap(),
        ))
    }

    pub fn scrape_service_on(&self, engine: Arc<dyn RenderingEngine>) -> Arc<ScrapeService> {
        Arc::new(ScrapeService::new(
            self.registry.clone(),
            self.store.clone(),
            self.ingestion.clone(),
            engine,
            Arc::new(SequentialIdProvider::new("run")),
            ScrapeConfig::default(),
        ))
    }

    pub fn dispatcher(&self) -> ScheduleDispatcher {
        ScheduleDispatcher::new(
            self.registry.clone(),
            self.ingestion.clone(),
            self.store.clone(),
            self.queue.clone(),
            Arc::new(SequentialIdProvider::new("dispatch")),
            self.clock.clone(),
            DispatchConfig::default(),
        )
    }

    pub fn worker(&self) -> Worker {
        Worker::new("scrape", self.queue.clone(), self.scrape_service())
    }

    pub fn worker_on(&self, engine: Arc<dyn RenderingEngine>) -> Worker {
        Worker::new("scrape", self.queue.clone(), self.scrape_service_on(engine))
    }
}
