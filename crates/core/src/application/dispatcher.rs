//! Schedule Dispatcher - one due/not-due decision per adapter per cycle
//!
//! Cadences are fetched fresh each cycle (falling back to one default entry
//! per registered adapter). A due adapter gets a run task on the scrape queue
//! and a last-dispatch marker whose TTL equals its interval, so the marker
//! expires exactly when the adapter is due again.
//!
//! Dispatch is at-least-once across processes: the marker read and write are
//! not serialized, and duplicate runs are absorbed by the deduper.

use crate::application::adapter::AdapterRegistry;
use crate::domain::{
    DispatchRecord, DispatchSummary, DomainError, DueState, ScrapeScheduleEntry,
    ScrapeTaskPayload,
};
use crate::error::Result;
use crate::port::{IdProvider, IngestionClient, KeyValueStore, TaskQueue, TimeProvider};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Task name consumed by the scrape worker
pub const SCRAPE_RUN_TASK: &str = "jobharvest.scrape.run";

/// Default queue for scrape runs
pub const DEFAULT_SCRAPE_QUEUE: &str = "scrape";

/// Default cadence when the API has none configured
pub const DEFAULT_SCRAPE_INTERVAL_MINUTES: u32 = 60;

/// Dispatcher configuration
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub default_interval_minutes: u32,
    pub queue_name: String,
    pub task_name: String,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            default_interval_minutes: DEFAULT_SCRAPE_INTERVAL_MINUTES,
            queue_name: DEFAULT_SCRAPE_QUEUE.to_string(),
            task_name: SCRAPE_RUN_TASK.to_string(),
        }
    }
}

/// Key of an adapter's last-dispatch marker
pub fn last_dispatch_key(adapter: &str) -> String {
    format!("scrape:last_dispatch:{}", adapter)
}

pub struct ScheduleDispatcher {
    registry: Arc<AdapterRegistry>,
    ingestion: Arc<dyn IngestionClient>,
    store: Arc<dyn KeyValueStore>,
    task_queue: Arc<dyn TaskQueue>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    config: DispatchConfig,
}

impl ScheduleDispatcher {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        ingestion: Arc<dyn IngestionClient>,
        store: Arc<dyn KeyValueStore>,
        task_queue: Arc<dyn TaskQueue>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
        config: DispatchConfig,
    ) -> Self {
        Self {
            registry,
            ingestion,
            store,
            task_queue,
            id_provider,
            time_provider,
            config,
        }
    }

    /// Evaluate every cadence once and dispatch the due ones
    ///
    /// # Errors
    /// Cadence fetch, store and queue failures abort the cycle. Adapters
    /// dispatched before the failure keep their fresh markers.
    pub async fn dispatch(&self) -> Result<DispatchSummary> {
        let schedules = self.load_schedules().await?;
        let now = self.time_provider.now();

        let mut details = Vec::with_capacity(schedules.len());
        for entry in &schedules {
            details.push(self.handle_entry(entry, now).await?);
        }

        let summary = DispatchSummary::from_records(details);
        info!(
            evaluated = summary.evaluated,
            dispatched = summary.dispatched,
            skipped = summary.skipped,
            "Scrape dispatch complete"
        );
        Ok(summary)
    }

    async fn load_schedules(&self) -> Result<Vec<ScrapeScheduleEntry>> {
        let schedules = self.ingestion.fetch_cadence().await?;
        if !schedules.is_empty() {
            return Ok(schedules);
        }

        debug!(
            adapters = self.registry.len(),
            interval_minutes = self.config.default_interval_minutes,
            "No cadence configured, using defaults for registered adapters"
        );
        Ok(self
            .registry
            .slugs()
            .map(|slug| ScrapeScheduleEntry::new(slug, self.config.default_interval_minutes))
            .collect())
    }

    async fn handle_entry(
        &self,
        entry: &ScrapeScheduleEntry,
        now: DateTime<Utc>,
    ) -> Result<DispatchRecord> {
        let key = last_dispatch_key(&entry.adapter);

        match entry.due_state(self.last_dispatch(&key).await?, now) {
            DueState::Disabled => {
                debug!(adapter = %entry.adapter, "Cadence disabled, skipping");
                return Ok(DispatchRecord::skipped(&entry.adapter));
            }
            DueState::NotDue => {
                debug!(adapter = %entry.adapter, "Not due yet, skipping");
                return Ok(DispatchRecord::skipped(&entry.adapter));
            }
            DueState::Due => {}
        }

        let run_id = self.id_provider.generate_id();
        let payload = ScrapeTaskPayload {
            adapter_name: entry.adapter.clone(),
            run_id: Some(run_id.clone()),
        };
        self.task_queue
            .submit(
                &self.config.task_name,
                serde_json::to_value(&payload)?,
                &self.config.queue_name,
            )
            .await?;

        self.store
            .set(
                &key,
                &now.to_rfc3339(),
                Duration::from_secs(entry.interval_seconds()),
            )
            .await?;

        info!(
            adapter = %entry.adapter,
            run_id = %run_id,
            queue = %self.config.queue_name,
            "Scrape dispatched"
        );
        Ok(DispatchRecord::dispatched(&entry.adapter, run_id))
    }

    async fn last_dispatch(&self, key: &str) -> Result<Option<DateTime<Utc>>> {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(None);
        };

        match parse_timestamp(&raw) {
            Ok(ts) => Ok(Some(ts)),
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unparseable last-dispatch marker");
                Ok(None)
            }
        }
    }
}

fn parse_timestamp(raw: &str) -> std::result::Result<DateTime<Utc>, DomainError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|e| DomainError::InvalidTimestamp {
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::REASON_NOT_DUE;
    use crate::error::AppError;
    use crate::port::task_queue::MockTaskQueue;
    use crate::testing::{
        InMemoryStore, InMemoryTaskQueue, ManualClock, RecordingIngestion, ScriptedAdapter,
        SequentialIdProvider,
    };
    use chrono::TimeZone;

    struct Fixture {
        clock: Arc<ManualClock>,
        store: Arc<InMemoryStore>,
        queue: Arc<InMemoryTaskQueue>,
        dispatcher: ScheduleDispatcher,
    }

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn registry(slugs: &[&str]) -> Arc<AdapterRegistry> {
        let mut registry = AdapterRegistry::new();
        for slug in slugs {
            registry.register(Arc::new(ScriptedAdapter::with_ids(*slug, &[])));
        }
        Arc::new(registry)
    }

    fn fixture(schedules: Vec<ScrapeScheduleEntry>, slugs: &[&str]) -> Fixture {
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(InMemoryStore::new(clock.clone()));
        let queue = Arc::new(InMemoryTaskQueue::new());

        let dispatcher = ScheduleDispatcher::new(
            registry(slugs),
            Arc::new(RecordingIngestion::with_schedules(schedules)),
            store.clone(),
            queue.clone(),
            Arc::new(SequentialIdProvider::new("run")),
            clock.clone(),
            DispatchConfig {
                default_interval_minutes: 45,
                ..DispatchConfig::default()
            },
        );

        Fixture {
            clock,
            store,
            queue,
            dispatcher,
        }
    }

    #[tokio::test]
    async fn test_falls_back_to_registered_adapters() {
        let fx = fixture(vec![], &["alpha-board", "beta-board"]);

        let summary = fx.dispatcher.dispatch().await.unwrap();

        assert_eq!(summary.evaluated, 2);
        assert_eq!(summary.dispatched, 2);
        assert_eq!(summary.skipped, 0);

        let tasks = fx.queue.tasks();
        assert_eq!(tasks.len(), 2);
        assert!(tasks.iter().all(|t| t.queue == DEFAULT_SCRAPE_QUEUE));
        assert!(tasks.iter().all(|t| t.task_name == SCRAPE_RUN_TASK));
        assert_eq!(tasks[0].payload["adapter_name"], "alpha-board");
        assert_eq!(tasks[0].payload["run_id"], "run-1");

        // Marker lives for the default interval (45 min)
        fx.clock.advance(chrono::Duration::minutes(44));
        assert!(fx.store.get(&last_dispatch_key("beta-board")).await.unwrap().is_some());
        fx.clock.advance(chrono::Duration::minutes(2));
        assert!(fx.store.get(&last_dispatch_key("beta-board")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_disabled_entry_is_skipped_as_not_due() {
        let mut entry = ScrapeScheduleEntry::new("demo-board", 15);
        entry.enabled = false;
        let fx = fixture(vec![entry], &["demo-board"]);

        let summary = fx.dispatcher.dispatch().await.unwrap();

        assert_eq!(summary.dispatched, 0);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.details[0].reason.as_deref(), Some(REASON_NOT_DUE));
        assert!(summary.details[0].run_id.is_none());
        assert!(fx.queue.tasks().is_empty());
    }

    #[tokio::test]
    async fn test_second_cycle_within_interval_skips() {
        let fx = fixture(vec![ScrapeScheduleEntry::new("demo-board", 60)], &["demo-board"]);

        let first = fx.dispatcher.dispatch().await.unwrap();
        fx.clock.advance(chrono::Duration::minutes(30));
        let second = fx.dispatcher.dispatch().await.unwrap();
        fx.clock.advance(chrono::Duration::minutes(31));
        let third = fx.dispatcher.dispatch().await.unwrap();

        assert_eq!(first.dispatched, 1);
        assert_eq!(second.dispatched, 0);
        assert_eq!(third.dispatched, 1);
        assert_eq!(fx.queue.tasks().len(), 2);
    }

    #[tokio::test]
    async fn test_marker_records_cycle_time() {
        let fx = fixture(vec![ScrapeScheduleEntry::new("demo-board", 10)], &["demo-board"]);

        fx.dispatcher.dispatch().await.unwrap();

        let raw = fx
            .store
            .get(&last_dispatch_key("demo-board"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(parse_timestamp(&raw).unwrap(), start());
    }

    #[tokio::test]
    async fn test_last_run_at_used_without_marker() {
        let mut entry = ScrapeScheduleEntry::new("demo-board", 60);
        entry.last_run_at = Some(start() - chrono::Duration::minutes(5));
        let fx = fixture(vec![entry], &["demo-board"]);

        let summary = fx.dispatcher.dispatch().await.unwrap();

        assert_eq!(summary.dispatched, 0);
    }

    #[tokio::test]
    async fn test_lost_store_makes_adapter_due_again() {
        let fx = fixture(vec![ScrapeScheduleEntry::new("demo-board", 60)], &["demo-board"]);

        fx.dispatcher.dispatch().await.unwrap();
        fx.store.clear();
        let summary = fx.dispatcher.dispatch().await.unwrap();

        assert_eq!(summary.dispatched, 1);
    }

    #[tokio::test]
    async fn test_garbage_marker_treated_as_absent() {
        let fx = fixture(vec![ScrapeScheduleEntry::new("demo-board", 60)], &["demo-board"]);
        fx.store
            .set(&last_dispatch_key("demo-board"), "yesterday-ish", Duration::from_secs(3600))
            .await
            .unwrap();

        let summary = fx.dispatcher.dispatch().await.unwrap();

        assert_eq!(summary.dispatched, 1);
    }

    #[tokio::test]
    async fn test_cadence_fetch_failure_propagates() {
        let clock = Arc::new(ManualClock::new(start()));
        let ingestion = Arc::new(RecordingIngestion::new());
        ingestion.fail_fetch_with("connection refused");

        let mut queue = MockTaskQueue::new();
        queue.expect_submit().never();

        let dispatcher = ScheduleDispatcher::new(
            registry(&["demo-board"]),
            ingestion,
            Arc::new(InMemoryStore::new(clock.clone())),
            Arc::new(queue),
            Arc::new(SequentialIdProvider::new("run")),
            clock,
            DispatchConfig::default(),
        );

        let err = dispatcher.dispatch().await.unwrap_err();
        assert!(matches!(err, AppError::Transport(_)));
    }

    #[tokio::test]
    async fn test_queue_failure_leaves_no_marker() {
        let clock = Arc::new(ManualClock::new(start()));
        let store = Arc::new(InMemoryStore::new(clock.clone()));

        let mut queue = MockTaskQueue::new();
        queue
            .expect_submit()
            .times(1)
            .returning(|_, _, _| Err(AppError::Storage("queue unavailable".into())));

        let dispatcher = ScheduleDispatcher::new(
            registry(&["demo-board"]),
            Arc::new(RecordingIngestion::new()),
            store.clone(),
            Arc::new(queue),
            Arc::new(SequentialIdProvider::new("run")),
            clock,
            DispatchConfig::default(),
        );

        assert!(dispatcher.dispatch().await.is_err());
        assert!(store.get(&last_dispatch_key("demo-board")).await.unwrap().is_none());
    }
}
