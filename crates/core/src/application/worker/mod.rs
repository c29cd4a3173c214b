// Worker - scrape task execution loop

pub mod constants;
mod shutdown;

use constants::*;
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};

use crate::application::dispatcher::SCRAPE_RUN_TASK;
use crate::application::scrape_service::ScrapeService;
use crate::domain::{QueuedTask, ScrapeTaskPayload};
use crate::error::Result;
use crate::port::TaskConsumer;
use std::sync::Arc;
use tokio::time::sleep;
use tracing::{error, info, warn};

/// Worker consumes scrape tasks from one queue.
///
/// Each task is one adapter run. Failures are recorded on the task and never
/// retried here; retry policy belongs to whoever enqueues.
pub struct Worker {
    queue: String,
    consumer: Arc<dyn TaskConsumer>,
    service: Arc<ScrapeService>,
}

impl Worker {
    pub fn new(
        queue: impl Into<String>,
        consumer: Arc<dyn TaskConsumer>,
        service: Arc<ScrapeService>,
    ) -> Self {
        Self {
            queue: queue.into(),
            consumer,
            service,
        }
    }

    /// Run worker loop with graceful shutdown support
    pub async fn run(&self, mut shutdown: ShutdownToken) -> Result<()> {
        info!(queue = %self.queue, "Worker started");
        loop {
            if shutdown.is_shutdown() {
                break;
            }
            match self.process_next_task().await {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        _ = sleep(IDLE_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Worker interrupted during idle");
                            break;
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "Worker error");
                    tokio::select! {
                        _ = sleep(ERROR_RECOVERY_SLEEP_DURATION) => {},
                        _ = shutdown.wait() => {
                            info!("Worker interrupted during error recovery");
                            break;
                        }
                    }
                }
            }
        }
        info!(queue = %self.queue, "Worker stopped");
        Ok(())
    }

    /// Process next task from the queue (returns true if a task was consumed)
    ///
    /// # Errors
    /// Only queue failures. Run failures are recorded on the task itself.
    pub async fn process_next_task(&self) -> Result<bool> {
        let Some(task) = self.consumer.pop_next(&self.queue).await? else {
            return Ok(false);
        };

        if task.task_name != SCRAPE_RUN_TASK {
            warn!(task_id = %task.id, task_name = %task.task_name, "Unknown task name");
            let reason = format!("unknown task name: {}", task.task_name);
            self.consumer.mark_failed(&task.id, &reason).await?;
            return Ok(true);
        }

        let payload = match decode_payload(&task) {
            Ok(p) => p,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "Malformed scrape task payload");
                self.consumer.mark_failed(&task.id, &e.to_string()).await?;
                return Ok(true);
            }
        };

        info!(task_id = %task.id, adapter = %payload.adapter_name, "Processing scrape task");

        // Spawned so a panicking adapter cannot take the worker down
        let service = Arc::clone(&self.service);
        let handle = tokio::task::spawn(async move {
            service
                .run_adapter(&payload.adapter_name, payload.run_id)
                .await
        });

        match handle.await {
            Ok(Ok(result)) => {
                info!(
                    task_id = %task.id,
                    run_id = %result.run_id,
                    sent = result.sent,
                    "Scrape task completed"
                );
                self.consumer.mark_done(&task.id).await?;
            }
            Ok(Err(e)) => {
                error!(task_id = %task.id, error = %e, "Scrape task failed");
                self.consumer.mark_failed(&task.id, &e.to_string()).await?;
            }
            Err(join_err) => {
                let reason = if join_err.is_panic() {
                    "scrape run panicked"
                } else {
                    "scrape run cancelled"
                };
                error!(task_id = %task.id, error = ?join_err, "{}", reason);
                self.consumer.mark_failed(&task.id, reason).await?;
            }
        }
        Ok(true)
    }
}

fn decode_payload(task: &QueuedTask) -> Result<ScrapeTaskPayload> {
    Ok(serde_json::from_value(task.payload.clone())?)
}
