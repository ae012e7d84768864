use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One entry of the session task list, as stored in `tasks.json`.
///
/// `id`, `title`, `description`, `dependencies`, `status` and `priority` are
/// present from creation; the timestamps and `duration` appear as the task
/// transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Unique within the session (e.g. `task_001`)
    pub id: String,
    pub title: String,
    pub description: String,
    /// Ids of tasks that must be `completed` before this one is eligible
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub status: TaskStatus,
    /// Higher runs first among eligible tasks; ties break by array order
    #[serde(default)]
    pub priority: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blocked_at: Option<DateTime<Utc>>,
    /// Seconds between `started_at` and the terminal timestamp, two decimals
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    /// Failure reason recorded when the task ends up blocked
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Task lifecycle status. Transitions are `pending -> completed` or
/// `pending -> blocked`, never backwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Completed,
    Blocked,
}

impl TaskRecord {
    /// Check if the task has reached a terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self.status, TaskStatus::Completed | TaskStatus::Blocked)
    }

    pub fn is_pending(&self) -> bool {
        self.status == TaskStatus::Pending
    }

    /// Stamp the start of an execution attempt
    pub fn mark_started(&mut self, now: DateTime<Utc>) {
        self.started_at = Some(now);
    }

    /// Transition `pending -> completed` and compute the duration
    pub fn mark_completed(&mut self, now: DateTime<Utc>) {
        debug_assert!(self.is_pending());
        self.status = TaskStatus::Completed;
        self.completed_at = Some(now);
        self.duration = self.elapsed_since_start(now);
    }

    /// Transition `pending -> blocked`, recording the failure reason
    pub fn mark_blocked(&mut self, now: DateTime<Utc>, reason: impl Into<String>) {
        debug_assert!(self.is_pending());
        self.status = TaskStatus::Blocked;
        self.blocked_at = Some(now);
        self.duration = self.elapsed_since_start(now);
        self.error = Some(reason.into());
    }

    fn elapsed_since_start(&self, now: DateTime<Utc>) -> Option<f64> {
        let started = self.started_at?;
        let millis = now.signed_duration_since(started).num_milliseconds();
        // two-decimal seconds
        Some(((millis as f64 / 1000.0) * 100.0).round() / 100.0)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Completed => "completed",
            TaskStatus::Blocked => "blocked",
        };
        write!(f, "{s}")
    }
}
