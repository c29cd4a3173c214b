// SQLite TaskQueue / TaskConsumer Implementation

use crate::error::map_sqlx_error;
use async_trait::async_trait;
use jobharvest_core::domain::{QueuedTask, TaskId, TaskState};
use jobharvest_core::error::{AppError, Result};
use jobharvest_core::port::{IdProvider, TaskConsumer, TaskQueue, TimeProvider};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{debug, warn};

pub struct SqliteTaskQueue {
    pool: SqlitePool,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
}

impl SqliteTaskQueue {
    pub fn new(
        pool: SqlitePool,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            pool,
            id_provider,
            time_provider,
        }
    }

    pub async fn find_by_id(&self, id: &str) -> Result<Option<QueuedTask>> {
        let row = sqlx::query_as::<_, TaskRow>(
            "SELECT id, queue, task_name, payload, state, created_at FROM tasks WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        row.map(TaskRow::into_task).transpose()
    }

    /// Failure reason recorded by `mark_failed`
    pub async fn error_for(&self, id: &str) -> Result<Option<String>> {
        let error: Option<Option<String>> =
            sqlx::query_scalar("SELECT error FROM tasks WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(map_sqlx_error)?;
        Ok(error.flatten())
    }

    pub async fn count_by_state(&self, queue: &str, state: TaskState) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM tasks WHERE queue = ? AND state = ?")
            .bind(queue)
            .bind(state.to_string())
            .fetch_one(&self.pool)
            .await
            .map_err(map_sqlx_error)
    }

    async fn finish(&self, id: &TaskId, state: TaskState, error: Option<&str>) -> Result<()> {
        let now = self.time_provider.now_millis();

        let result = sqlx::query(
            "UPDATE tasks SET state = ?, error = ?, finished_at = ? WHERE id = ?",
        )
        .bind(state.to_string())
        .bind(error)
        .bind(now)
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(AppError::Storage(format!("Task not found: {}", id)));
        }
        Ok(())
    }
}

#[async_trait]
impl TaskQueue for SqliteTaskQueue {
    async fn submit(&self, task_name: &str, payload: serde_json::Value, queue: &str) -> Result<()> {
        let id = self.id_provider.generate_id();

        sqlx::query(
            r#"
            INSERT INTO tasks (id, queue, task_name, payload, state, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(queue)
        .bind(task_name)
        .bind(payload.to_string())
        .bind(TaskState::Queued.to_string())
        .bind(self.time_provider.now_millis())
        .execute(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        debug!(task_id = %id, task_name = %task_name, queue = %queue, "Task enqueued");
        Ok(())
    }
}

#[async_trait]
impl TaskConsumer for SqliteTaskQueue {
    async fn pop_next(&self, queue: &str) -> Result<Option<QueuedTask>> {
        let now = self.time_provider.now_millis();

        // Claim in a single statement so concurrent workers never share a task
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
            SET state = ?, started_at = ?
            WHERE id = (
                SELECT id FROM tasks
                WHERE queue = ? AND state = ?
                ORDER BY created_at ASC, rowid ASC
                LIMIT 1
            )
            RETURNING id, queue, task_name, payload, state, created_at
            "#,
        )
        .bind(TaskState::Running.to_string())
        .bind(now)
        .bind(queue)
        .bind(TaskState::Queued.to_string())
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };

        // A claimed row that cannot be decoded must not stay RUNNING
        let id = row.id.clone();
        match row.into_task() {
            Ok(task) => Ok(Some(task)),
            Err(e) => {
                warn!(task_id = %id, error = %e, "Claimed task is unreadable, marking failed");
                let reason = format!("unreadable task: {}", e);
                self.finish(&id, TaskState::Failed, Some(&reason)).await?;
                Err(e)
            }
        }
    }

    async fn mark_done(&self, id: &TaskId) -> Result<()> {
        self.finish(id, TaskState::Done, None).await
    }

    async fn mark_failed(&self, id: &TaskId, error: &str) -> Result<()> {
        self.finish(id, TaskState::Failed, Some(error)).await
    }
}

#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: String,
    queue: String,
    task_name: String,
    payload: String,
    state: String,
    created_at: i64,
}

impl TaskRow {
    fn into_task(self) -> Result<QueuedTask> {
        let state = self
            .state
            .parse::<TaskState>()
            .map_err(AppError::Storage)?;
        Ok(QueuedTask {
            id: self.id,
            queue: self.queue,
            task_name: self.task_name,
            payload: serde_json::from_str(&self.payload)?,
            state,
            created_at: self.created_at,
        })
    }
}
