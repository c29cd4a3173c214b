// ============================================================================
// Fake Implementations for Testing
// ============================================================================
//
// Hand-written port fakes shared by unit tests, the integration-test crate and
// downstream adapter crates.

use crate::application::adapter::{AdapterContext, JobStream, SiteAdapter};
use crate::domain::{NormalizedJob, QueuedTask, ScrapeScheduleEntry, TaskId, TaskState};
use crate::error::{AppError, Result};
use crate::port::{
    IdProvider, IngestionClient, KeyValueStore, RenderingEngine, RenderingSession, TaskConsumer,
    TaskQueue, TimeProvider,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Clock that only moves when told to
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl TimeProvider for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Deterministic IDs: `<prefix>-1`, `<prefix>-2`, ...
pub struct SequentialIdProvider {
    prefix: String,
    counter: AtomicUsize,
}

impl SequentialIdProvider {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            counter: AtomicUsize::new(0),
        }
    }
}

impl IdProvider for SequentialIdProvider {
    fn generate_id(&self) -> String {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        format!("{}-{}", self.prefix, n)
    }
}

/// In-memory key-value store honoring TTL against an injected clock
pub struct InMemoryStore {
    clock: Arc<dyn TimeProvider>,
    entries: Mutex<HashMap<String, (String, DateTime<Utc>)>>,
}

impl InMemoryStore {
    pub fn new(clock: Arc<dyn TimeProvider>) -> Self {
        Self {
            clock,
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn expiry(&self, ttl: Duration) -> DateTime<Utc> {
        let ttl = chrono::Duration::from_std(ttl).unwrap_or_else(|_| chrono::Duration::days(36_500));
        self.clock.now() + ttl
    }

    /// Live keys starting with `prefix`
    pub fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let now = self.clock.now();
        let mut keys: Vec<String> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, (_, exp))| k.starts_with(prefix) && *exp > now)
            .map(|(k, _)| k.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Remove everything (simulates losing the store)
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

#[async_trait]
impl KeyValueStore for InMemoryStore {
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> Result<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.lock().unwrap();
        match entries.get(key) {
            Some((_, exp)) if *exp > now => Ok(false),
            _ => {
                entries.insert(key.to_string(), (value.to_string(), expires_at));
                Ok(true)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<()> {
        let expires_at = self.expiry(ttl);
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), (value.to_string(), expires_at));
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = self.clock.now();
        Ok(self
            .entries
            .lock()
            .unwrap()
            .get(key)
            .filter(|(_, exp)| *exp > now)
            .map(|(v, _)| v.clone()))
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = self.clock.now();
        let expires_at = self.expiry(ttl);
        let mut entries = self.entries.lock().unwrap();
        match entries.get_mut(key) {
            Some((_, exp)) if *exp > now => {
                *exp = expires_at;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

/// One recorded ingestion call
#[derive(Debug, Clone)]
pub struct IngestCall {
    pub adapter: String,
    pub run_id: String,
    pub jobs: Vec<NormalizedJob>,
}

/// Ingestion client that records batches and serves a fixed cadence list
#[derive(Default)]
pub struct RecordingIngestion {
    calls: Mutex<Vec<IngestCall>>,
    schedules: Mutex<Vec<ScrapeScheduleEntry>>,
    fail_submit: Mutex<Option<String>>,
    fail_fetch: Mutex<Option<String>>,
}

impl RecordingIngestion {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedules(schedules: Vec<ScrapeScheduleEntry>) -> Self {
        let client = Self::default();
        *client.schedules.lock().unwrap() = schedules;
        client
    }

    pub fn fail_submit_with(&self, message: impl Into<String>) {
        *self.fail_submit.lock().unwrap() = Some(message.into());
    }

    pub fn fail_fetch_with(&self, message: impl Into<String>) {
        *self.fail_fetch.lock().unwrap() = Some(message.into());
    }

    pub fn calls(&self) -> Vec<IngestCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl IngestionClient for RecordingIngestion {
    async fn submit(
        &self,
        adapter: &str,
        run_id: &str,
        jobs: &[NormalizedJob],
    ) -> Result<serde_json::Value> {
        if let Some(msg) = self.fail_submit.lock().unwrap().clone() {
            return Err(AppError::Transport(msg));
        }
        self.calls.lock().unwrap().push(IngestCall {
            adapter: adapter.to_string(),
            run_id: run_id.to_string(),
            jobs: jobs.to_vec(),
        });
        Ok(serde_json::json!({ "accepted": jobs.len() }))
    }

    async fn fetch_cadence(&self) -> Result<Vec<ScrapeScheduleEntry>> {
        if let Some(msg) = self.fail_fetch.lock().unwrap().clone() {
            return Err(AppError::Transport(msg));
        }
        Ok(self.schedules.lock().unwrap().clone())
    }
}

/// In-memory FIFO task queue (producer and consumer side)
#[derive(Default)]
pub struct InMemoryTaskQueue {
    tasks: Mutex<Vec<QueuedTask>>,
    errors: Mutex<HashMap<TaskId, String>>,
    counter: AtomicUsize,
}

impl InMemoryTaskQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tasks(&self) -> Vec<QueuedTask> {
        self.tasks.lock().unwrap().clone()
    }

    pub fn error_for(&self, id: &str) -> Option<String> {
        self.errors.lock().unwrap().get(id).cloned()
    }

    fn set_state(&self, id: &TaskId, state: TaskState) -> Result<()> {
        let mut tasks = self.tasks.lock().unwrap();
        let task = tasks
            .iter_mut()
            .find(|t| &t.id == id)
            .ok_or_else(|| AppError::Storage(format!("task not found: {}", id)))?;
        task.state = state;
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for InMemoryTaskQueue {
    async fn submit(&self, task_name: &str, payload: serde_json::Value, queue: &str) -> Result<()> {
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        self.tasks.lock().unwrap().push(QueuedTask {
            id: format!("task-{}", n),
            queue: queue.to_string(),
            task_name: task_name.to_string(),
            payload,
            state: TaskState::Queued,
            created_at: n as i64,
        });
        Ok(())
    }
}

#[async_trait]
impl TaskConsumer for InMemoryTaskQueue {
    async fn pop_next(&self, queue: &str) -> Result<Option<QueuedTask>> {
        let mut tasks = self.tasks.lock().unwrap();
        let next = tasks
            .iter_mut()
            .find(|t| t.queue == queue && t.state == TaskState::Queued);
        Ok(next.map(|t| {
            t.state = TaskState::Running;
            t.clone()
        }))
    }

    async fn mark_done(&self, id: &TaskId) -> Result<()> {
        self.set_state(id, TaskState::Done)
    }

    async fn mark_failed(&self, id: &TaskId, error: &str) -> Result<()> {
        self.errors
            .lock()
            .unwrap()
            .insert(id.clone(), error.to_string());
        self.set_state(id, TaskState::Failed)
    }
}

/// Rendering engine whose sessions serve a fixed document
pub struct ScriptedEngine {
    supported: Vec<String>,
    document: String,
    opened: AtomicUsize,
    closed: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
}

impl ScriptedEngine {
    pub fn new(supported: &[&str]) -> Self {
        Self::with_document(supported, "<html></html>")
    }

    pub fn with_document(supported: &[&str], document: impl Into<String>) -> Self {
        Self {
            supported: supported.iter().map(|s| s.to_string()).collect(),
            document: document.into(),
            opened: AtomicUsize::new(0),
            closed: Arc::new(AtomicUsize::new(0)),
            visited: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().unwrap().clone()
    }
}

#[async_trait]
impl RenderingEngine for ScriptedEngine {
    async fn open(&self, engine: &str) -> Result<Box<dyn RenderingSession>> {
        if !self.supported.iter().any(|s| s == engine) {
            return Err(AppError::Config(format!(
                "Unsupported rendering engine '{}'",
                engine
            )));
        }
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(ScriptedSession {
            document: self.document.clone(),
            loaded: false,
            closed: false,
            close_counter: Arc::clone(&self.closed),
            visited: Arc::clone(&self.visited),
        }))
    }
}

struct ScriptedSession {
    document: String,
    loaded: bool,
    closed: bool,
    close_counter: Arc<AtomicUsize>,
    visited: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl RenderingSession for ScriptedSession {
    async fn goto(&mut self, url: &str) -> Result<()> {
        if self.closed {
            return Err(AppError::InvalidState("session closed".into()));
        }
        self.visited.lock().unwrap().push(url.to_string());
        self.loaded = true;
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        if self.closed || !self.loaded {
            return Err(AppError::InvalidState("no document loaded".into()));
        }
        Ok(self.document.clone())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.close_counter.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// One step of a scripted adapter run
#[derive(Debug, Clone)]
pub enum ScriptStep {
    Yield(NormalizedJob),
    Fail(String),
}

/// Adapter that replays a fixed script on every `scrape` call
pub struct ScriptedAdapter {
    slug: String,
    steps: Vec<ScriptStep>,
    rate_limit_per_minute: u32,
    dedupe_ttl_seconds: u64,
    dedupe_key: Option<fn(&NormalizedJob) -> String>,
}

impl ScriptedAdapter {
    pub fn new(slug: impl Into<String>, steps: Vec<ScriptStep>) -> Self {
        Self {
            slug: slug.into(),
            steps,
            rate_limit_per_minute: crate::application::adapter::DEFAULT_RATE_LIMIT_PER_MINUTE,
            dedupe_ttl_seconds: crate::application::dedupe::DEFAULT_DEDUPE_TTL_SECONDS,
            dedupe_key: None,
        }
    }

    /// Adapter yielding one job per external id, in order
    pub fn with_ids(slug: impl Into<String>, ids: &[&str]) -> Self {
        let steps = ids.iter().map(|id| ScriptStep::Yield(sample_job(id))).collect();
        Self::new(slug, steps)
    }

    pub fn rate_limit(mut self, per_minute: u32) -> Self {
        self.rate_limit_per_minute = per_minute;
        self
    }

    pub fn dedupe_ttl(mut self, seconds: u64) -> Self {
        self.dedupe_ttl_seconds = seconds;
        self
    }

    /// Fingerprint jobs with `key` instead of the default
    pub fn dedupe_by(mut self, key: fn(&NormalizedJob) -> String) -> Self {
        self.dedupe_key = Some(key);
        self
    }
}

impl SiteAdapter for ScriptedAdapter {
    fn slug(&self) -> &str {
        &self.slug
    }

    fn display_name(&self) -> &str {
        "Scripted Board"
    }

    fn rate_limit_per_minute(&self) -> u32 {
        self.rate_limit_per_minute
    }

    fn dedupe_ttl_seconds(&self) -> u64 {
        self.dedupe_ttl_seconds
    }

    fn dedupe_key(&self, job: &NormalizedJob) -> String {
        match self.dedupe_key {
            Some(key) => key(job),
            None => job.default_fingerprint().to_string(),
        }
    }

    fn scrape<'a>(
        &'a self,
        ctx: &'a AdapterContext,
        session: &'a mut dyn RenderingSession,
    ) -> JobStream<'a> {
        stream::once(async move {
            ctx.throttle().await;
            session.goto(&format!("scripted://{}", self.slug)).await?;
            let items = self.steps.iter().map(|step| match step {
                ScriptStep::Yield(job) => Ok(job.clone()),
                ScriptStep::Fail(msg) => Err(AppError::Adapter(msg.clone())),
            });
            Ok::<_, AppError>(stream::iter(items))
        })
        .try_flatten()
        .boxed()
    }
}

/// Minimal valid job for `external_id`
pub fn sample_job(external_id: &str) -> NormalizedJob {
    NormalizedJob::new(
        external_id,
        format!("Engineer {}", external_id),
        "Example Corp",
        "Sample listing",
        format!("https://jobs.example/{}", external_id),
    )
}
