// Task Queue Ports

use crate::domain::{QueuedTask, TaskId};
use crate::error::Result;
use async_trait::async_trait;

/// Producer side: fire-and-forget submission.
/// Delivery and retry guarantees belong to the queue implementation.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskQueue: Send + Sync {
    async fn submit(&self, task_name: &str, payload: serde_json::Value, queue: &str) -> Result<()>;
}

/// Consumer side, used by the worker loop
#[async_trait]
pub trait TaskConsumer: Send + Sync {
    /// Atomically claim the oldest queued task (sets it RUNNING)
    async fn pop_next(&self, queue: &str) -> Result<Option<QueuedTask>>;

    async fn mark_done(&self, id: &TaskId) -> Result<()>;

    async fn mark_failed(&self, id: &TaskId, error: &str) -> Result<()>;
}
