// Composition Root - DI wiring shared by every subcommand

use crate::settings::{StoreBackend, WorkerSettings};
use anyhow::{Context, Result};
use jobharvest_adapters::builtin_registry;
use jobharvest_core::application::{
    AdapterRegistry, DispatchLoop, ScheduleDispatcher, ScrapeService, Worker,
};
use jobharvest_core::port::id_provider::UuidProvider;
use jobharvest_core::port::time_provider::SystemTimeProvider;
use jobharvest_core::port::{
    IdProvider, IngestionClient, KeyValueStore, RenderingEngine, StoreMaintenance, TimeProvider,
};
use jobharvest_infra_http::{HttpIngestionClient, IngestionClientConfig, StaticRenderingEngine};
use jobharvest_infra_redis::RedisStore;
use jobharvest_infra_sqlite::{create_pool, run_migrations, SqliteStore, SqliteTaskQueue};
use std::sync::Arc;
use tracing::info;

pub struct App {
    pub settings: WorkerSettings,
    pub registry: Arc<AdapterRegistry>,
    store: Arc<dyn KeyValueStore>,
    /// Present only for stores without native expiry
    maintenance: Option<Arc<dyn StoreMaintenance>>,
    task_queue: Arc<SqliteTaskQueue>,
    ingestion: Arc<dyn IngestionClient>,
    engine: Arc<dyn RenderingEngine>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl App {
    pub async fn build(settings: WorkerSettings) -> Result<Self> {
        let time_provider: Arc<dyn TimeProvider> = Arc::new(SystemTimeProvider);
        let id_provider: Arc<dyn IdProvider> = Arc::new(UuidProvider);

        info!(database_url = %settings.database_url, "Initializing database...");
        let pool = create_pool(&settings.database_url)
            .await
            .context("DB pool creation failed")?;
        run_migrations(&pool).await.context("Migration failed")?;

        // The task queue always lives in SQLite; the shared store is configurable
        let task_queue = Arc::new(SqliteTaskQueue::new(
            pool.clone(),
            id_provider.clone(),
            time_provider.clone(),
        ));

        let (store, maintenance): (Arc<dyn KeyValueStore>, Option<Arc<dyn StoreMaintenance>>) =
            match settings.store_backend {
                StoreBackend::Sqlite => {
                    let sqlite = Arc::new(SqliteStore::new(pool, time_provider.clone()));
                    let store: Arc<dyn KeyValueStore> = sqlite.clone();
                    let maintenance: Arc<dyn StoreMaintenance> = sqlite;
                    (store, Some(maintenance))
                }
                StoreBackend::Redis => {
                    let redis = RedisStore::connect(&settings.redis_url)
                        .await
                        .context("Redis connection failed")?;
                    let store: Arc<dyn KeyValueStore> = Arc::new(redis);
                    (store, None)
                }
            };
        info!(backend = ?settings.store_backend, "Shared store ready");

        let ingestion = Arc::new(
            HttpIngestionClient::new(IngestionClientConfig {
                base_url: settings.api_base_url.clone(),
                api_token: settings.api_token.clone(),
                timeout: settings.request_timeout(),
            })
            .context("Ingestion client setup failed")?,
        );
        let engine = Arc::new(
            StaticRenderingEngine::new(settings.request_timeout())
                .context("Rendering engine setup failed")?,
        );

        Ok(Self {
            settings,
            registry: Arc::new(builtin_registry()),
            store,
            maintenance,
            task_queue,
            ingestion,
            engine,
            id_provider,
            time_provider,
        })
    }

    pub fn scrape_service(&self) -> ScrapeService {
        ScrapeService::new(
            self.registry.clone(),
            self.store.clone(),
            self.ingestion.clone(),
            self.engine.clone(),
            self.id_provider.clone(),
            self.settings.scrape_config(),
        )
    }

    pub fn dispatcher(&self) -> ScheduleDispatcher {
        ScheduleDispatcher::new(
            self.registry.clone(),
            self.ingestion.clone(),
            self.store.clone(),
            self.task_queue.clone(),
            self.id_provider.clone(),
            self.time_provider.clone(),
            self.settings.dispatch_config(),
        )
    }

    pub fn dispatch_loop(&self) -> DispatchLoop {
        let dispatch_loop =
            DispatchLoop::new(Arc::new(self.dispatcher()), self.settings.dispatch_tick());
        match &self.maintenance {
            Some(maintenance) => dispatch_loop.with_maintenance(maintenance.clone()),
            None => dispatch_loop,
        }
    }

    pub fn worker(&self) -> Worker {
        Worker::new(
            self.settings.scrape_queue_name.clone(),
            self.task_queue.clone(),
            Arc::new(self.scrape_service()),
        )
    }
}
