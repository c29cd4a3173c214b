// Task Queue Domain Model

use serde::{Deserialize, Serialize};

/// Task ID (UUID v4)
pub type TaskId = String;

/// Lifecycle of a queued task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskState {
    Queued,
    Running,
    Done,
    Failed,
}

impl std::fmt::Display for TaskState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskState::Queued => write!(f, "QUEUED"),
            TaskState::Running => write!(f, "RUNNING"),
            TaskState::Done => write!(f, "DONE"),
            TaskState::Failed => write!(f, "FAILED"),
        }
    }
}

impl std::str::FromStr for TaskState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "QUEUED" => Ok(TaskState::Queued),
            "RUNNING" => Ok(TaskState::Running),
            "DONE" => Ok(TaskState::Done),
            "FAILED" => Ok(TaskState::Failed),
            other => Err(format!("unknown task state: {}", other)),
        }
    }
}

/// A task claimed from the queue
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedTask {
    pub id: TaskId,
    pub queue: String,
    pub task_name: String,
    pub payload: serde_json::Value,
    pub state: TaskState,
    pub created_at: i64, // epoch ms
}

/// Payload of the scrape-run task, as produced by the dispatcher
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrapeTaskPayload {
    pub adapter_name: String,
    #[serde(default)]
    pub run_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_roundtrip_via_display() {
        for state in [TaskState::Queued, TaskState::Running, TaskState::Done, TaskState::Failed] {
            assert_eq!(state.to_string().parse::<TaskState>().unwrap(), state);
        }
    }

    #[test]
    fn test_payload_run_id_optional() {
        let payload: ScrapeTaskPayload =
            serde_json::from_value(serde_json::json!({"adapter_name": "demo-board"})).unwrap();
        assert_eq!(payload.run_id, None);
    }
}
