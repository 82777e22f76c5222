use serde::{Deserialize, Serialize};

#[cfg(feature = "sqlx")]
use sqlx::FromRow;

use crate::kind::ReminderKind;

/// Lifecycle state of a reminder task.
///
/// `Pending` is the only non-terminal state. A task never moves out of a
/// terminal state; rescheduling cancels and recreates rather than mutating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Failed => "failed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, TaskStatus::Pending)
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "failed" => Ok(TaskStatus::Failed),
            "cancelled" | "canceled" => Ok(TaskStatus::Cancelled),
            _ => Err(()),
        }
    }
}

/// A reminder task row as stored in the task store.
///
/// At most one `pending` row exists per `(subject_id, kind)` pair; the store
/// enforces this with a partial unique index and upsert-on-conflict.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(FromRow))]
pub struct ReminderTask {
    pub id: String,
    pub subject_id: String,
    pub kind: String,
    /// RFC3339 instant at which the task should fire.
    pub scheduled_at: String,
    pub status: String,
    pub created_at: String,
    pub updated_at: String,
}

impl ReminderTask {
    pub fn status_enum(&self) -> TaskStatus {
        self.status.parse().unwrap_or_default()
    }

    pub fn kind_enum(&self) -> Option<ReminderKind> {
        self.kind.parse().ok()
    }

    pub fn scheduled_at_utc(&self) -> Option<chrono::DateTime<chrono::Utc>> {
        chrono::DateTime::parse_from_rfc3339(&self.scheduled_at)
            .ok()
            .map(|dt| dt.with_timezone(&chrono::Utc))
    }

    pub fn is_pending(&self) -> bool {
        self.status_enum() == TaskStatus::Pending
    }
}
