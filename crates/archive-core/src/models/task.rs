use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::DerivativeKind;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    GenerateDerivatives,
}

impl Display for TaskType {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskType::GenerateDerivatives => write!(f, "generate_derivatives"),
        }
    }
}

impl FromStr for TaskType {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "generate_derivatives" => Ok(TaskType::GenerateDerivatives),
            _ => Err(anyhow::anyhow!("Invalid task type: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Scheduled,
}

impl Display for TaskStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed => write!(f, "failed"),
            TaskStatus::Scheduled => write!(f, "scheduled"),
        }
    }
}

/// Payload of a derivative job: which file, and which passes to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DerivativeJobPayload {
    pub file_id: Uuid,
    #[serde(default = "DerivativeJobPayload::all_passes")]
    pub passes: Vec<DerivativeKind>,
}

impl DerivativeJobPayload {
    /// Both passes, as run after an upload.
    pub fn all(file_id: Uuid) -> Self {
        Self {
            file_id,
            passes: Self::all_passes(),
        }
    }

    pub fn only(file_id: Uuid, kind: DerivativeKind) -> Self {
        Self {
            file_id,
            passes: vec![kind],
        }
    }

    fn all_passes() -> Vec<DerivativeKind> {
        vec![DerivativeKind::Thumbnail, DerivativeKind::Preview]
    }
}

/// A unit of background work as tracked by the task queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub task_type: TaskType,
    pub status: TaskStatus,
    pub payload: serde_json::Value,
    pub retry_count: i32,
    pub max_retries: i32,
    pub timeout_seconds: Option<u64>,
    pub scheduled_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Task {
    pub fn new(
        task_type: TaskType,
        payload: serde_json::Value,
        max_retries: i32,
        timeout_seconds: Option<u64>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            task_type,
            status: TaskStatus::Pending,
            payload,
            retry_count: 0,
            max_retries,
            timeout_seconds,
            scheduled_at: now,
            created_at: now,
        }
    }

    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_type_round_trips_through_strings() {
        let parsed: TaskType = TaskType::GenerateDerivatives.to_string().parse().unwrap();
        assert_eq!(parsed, TaskType::GenerateDerivatives);
        assert!("video_transcode".parse::<TaskType>().is_err());
    }

    #[test]
    fn payload_defaults_to_both_passes() {
        let file_id = Uuid::new_v4();
        let payload: DerivativeJobPayload =
            serde_json::from_value(serde_json::json!({ "file_id": file_id })).unwrap();
        assert_eq!(payload, DerivativeJobPayload::all(file_id));
        assert_eq!(
            payload.passes,
            vec![DerivativeKind::Thumbnail, DerivativeKind::Preview]
        );
    }

    #[test]
    fn single_pass_payload() {
        let payload = DerivativeJobPayload::only(Uuid::new_v4(), DerivativeKind::Preview);
        assert_eq!(payload.passes, vec![DerivativeKind::Preview]);
    }

    #[test]
    fn retry_budget() {
        let mut task = Task::new(TaskType::GenerateDerivatives, serde_json::json!({}), 2, None);
        assert!(task.can_retry());
        task.retry_count = 2;
        assert!(!task.can_retry());
    }
}
