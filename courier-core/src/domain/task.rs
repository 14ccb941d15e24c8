//! Task domain types

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

/// An email waiting to be delivered
///
/// Created by the queue gateway on enqueue, mutated only through
/// `mark_status` by the batch executor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub recipient: String,
    pub subject: String,
    pub body: String,
    pub status: TaskStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

impl Task {
    /// Creates a new pending task with a fresh id
    pub fn new(
        recipient: impl Into<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            recipient: recipient.into(),
            subject: subject.into(),
            body: body.into(),
            status: TaskStatus::Pending,
            created_at: chrono::Utc::now(),
        }
    }
}

/// Delivery status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    Pending,
    Sending,
    Sent,
    Failed,
    RetryPending,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Sending => "SENDING",
            TaskStatus::Sent => "SENT",
            TaskStatus::Failed => "FAILED",
            TaskStatus::RetryPending => "RETRY_PENDING",
        }
    }

    /// Sent and Failed are final; nothing moves a task out of them
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Sent | TaskStatus::Failed)
    }

    /// Whether a fetch may hand this task out (lease permitting)
    pub fn is_fetchable(&self) -> bool {
        matches!(self, TaskStatus::Pending | TaskStatus::RetryPending)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown task status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for TaskStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(TaskStatus::Pending),
            "SENDING" => Ok(TaskStatus::Sending),
            "SENT" => Ok(TaskStatus::Sent),
            "FAILED" => Ok(TaskStatus::Failed),
            "RETRY_PENDING" => Ok(TaskStatus::RetryPending),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_screaming_snake_case() {
        let json = serde_json::to_string(&TaskStatus::RetryPending).unwrap();
        assert_eq!(json, "\"RETRY_PENDING\"");

        let parsed: TaskStatus = serde_json::from_str("\"SENT\"").unwrap();
        assert_eq!(parsed, TaskStatus::Sent);
    }

    #[test]
    fn test_status_string_matches_serde() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::Sending,
            TaskStatus::Sent,
            TaskStatus::Failed,
            TaskStatus::RetryPending,
        ] {
            let json = serde_json::to_string(&status).unwrap();
            assert_eq!(json.trim_matches('"'), status.as_str());
            assert_eq!(status.as_str().parse::<TaskStatus>(), Ok(status));
        }
    }

    #[test]
    fn test_unknown_status_is_rejected() {
        let err = "DELIVERED".parse::<TaskStatus>().unwrap_err();
        assert_eq!(err, UnknownStatus("DELIVERED".to_string()));
        assert_eq!(err.to_string(), "unknown task status: DELIVERED");
    }

    #[test]
    fn test_terminal_and_fetchable() {
        assert!(TaskStatus::Sent.is_terminal());
        assert!(TaskStatus::Failed.is_terminal());
        assert!(!TaskStatus::Sending.is_terminal());

        assert!(TaskStatus::Pending.is_fetchable());
        assert!(TaskStatus::RetryPending.is_fetchable());
        assert!(!TaskStatus::Sending.is_fetchable());
        assert!(!TaskStatus::Sent.is_fetchable());
    }

    #[test]
    fn test_new_task_is_pending() {
        let task = Task::new("a@example.com", "Hi", "Hello there!");
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.recipient, "a@example.com");
    }
}
