//! Job model and the finite state machine governing its lifecycle.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::engine::Engine;
use crate::failure::FailureReason;

/// Canonical job states. `pending` and `processing` are legacy aliases
/// normalized to `queued` / `running` on read (see [`JobStatus::normalize`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Assigned,
    Running,
    Completed,
    Failed,
    Canceled,
    Rejected,
    Retrying,
    TimedOut,
    Paused,
}

impl JobStatus {
    /// Normalizes legacy status strings read from older store rows.
    pub fn normalize(raw: &str) -> Option<Self> {
        let mapped = match raw {
            "pending" => "queued",
            "processing" => "running",
            other => other,
        };
        serde_json::from_value(serde_json::Value::String(mapped.to_string())).ok()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Assigned => "assigned",
            JobStatus::Running => "running",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
            JobStatus::Canceled => "canceled",
            JobStatus::Rejected => "rejected",
            JobStatus::Retrying => "retrying",
            JobStatus::TimedOut => "timed_out",
            JobStatus::Paused => "paused",
        }
    }

    /// Terminal states never transition further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed | JobStatus::Canceled | JobStatus::Rejected
        )
    }

    /// A job owns a worker exactly while it is in one of these states.
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            JobStatus::Assigned | JobStatus::Running | JobStatus::Paused
        )
    }

    /// States a scheduler may pick up for (re)dispatch.
    pub fn is_assignable(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Retrying)
    }

    /// Whether a failure from this state is eligible for retry.
    pub fn is_retryable_origin(&self) -> bool {
        matches!(self, JobStatus::Failed | JobStatus::TimedOut)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    Live,
    Default,
    Batch,
}

impl Default for Queue {
    fn default() -> Self {
        Queue::Default
    }
}

impl Queue {
    /// Lower rank dispatches first. `live < default < batch`.
    pub fn rank(&self) -> u8 {
        match self {
            Queue::Live => 0,
            Queue::Default => 1,
            Queue::Batch => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Queue::Live => "live",
            Queue::Default => "default",
            Queue::Batch => "batch",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Default for Priority {
    fn default() -> Self {
        Priority::Medium
    }
}

impl Priority {
    /// Lower rank dispatches first. `high < medium < low`.
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }
}

/// An entry in a job's append-only transition history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transition {
    pub from: String,
    pub to: String,
    pub timestamp: DateTime<Utc>,
    pub reason: Option<String>,
}

impl Transition {
    pub fn new(from: JobStatus, to: JobStatus, reason: Option<String>) -> Self {
        Self {
            from: from.as_str().to_string(),
            to: to.as_str().to_string(),
            timestamp: Utc::now(),
            reason,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: Uuid,
    /// Monotonic, human-friendly identifier assigned at creation.
    pub sequence_number: i64,
    pub scenario: String,
    pub engine: Engine,
    pub confidence: f64,
    pub queue: Queue,
    pub priority: Priority,
    pub parameters: BTreeMap<String, serde_json::Value>,
    pub required_capabilities: Vec<String>,
    pub status: JobStatus,
    pub node_id: Option<Uuid>,
    pub retry_count: i32,
    pub max_retries: i32,
    pub error: Option<String>,
    pub failure_reason: Option<FailureReason>,
    pub progress: i32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub state_transitions: Vec<Transition>,
    pub wrapper_enabled: bool,
    pub wrapper_constraints: Option<serde_json::Value>,
}

impl Job {
    /// Clamp a reported progress value into `[0, 100]`.
    pub fn clamp_progress(value: i32) -> i32 {
        value.clamp(0, 100)
    }
}

/// Exhaustive permitted `(from, to)` pairs. Any pair not listed here
/// is rejected by the store's compare-and-set transition.
pub const TRANSITIONS: &[(JobStatus, JobStatus)] = &[
    (JobStatus::Queued, JobStatus::Assigned),
    (JobStatus::Queued, JobStatus::Canceled),
    (JobStatus::Queued, JobStatus::Rejected),
    (JobStatus::Assigned, JobStatus::Running),
    (JobStatus::Assigned, JobStatus::Retrying),
    (JobStatus::Assigned, JobStatus::Canceled),
    (JobStatus::Assigned, JobStatus::Failed),
    (JobStatus::Running, JobStatus::Completed),
    (JobStatus::Running, JobStatus::Failed),
    (JobStatus::Running, JobStatus::TimedOut),
    (JobStatus::Running, JobStatus::Paused),
    (JobStatus::Running, JobStatus::Canceled),
    (JobStatus::Running, JobStatus::Retrying),
    (JobStatus::Paused, JobStatus::Running),
    (JobStatus::Paused, JobStatus::Canceled),
    (JobStatus::TimedOut, JobStatus::Retrying),
    (JobStatus::TimedOut, JobStatus::Failed),
    (JobStatus::TimedOut, JobStatus::Canceled),
    (JobStatus::Retrying, JobStatus::Queued),
    (JobStatus::Retrying, JobStatus::Failed),
    (JobStatus::Retrying, JobStatus::Rejected),
    (JobStatus::Retrying, JobStatus::Canceled),
];

/// Is `(from, to)` a permitted transition per the table above?
pub fn is_allowed_transition(from: JobStatus, to: JobStatus) -> bool {
    TRANSITIONS.iter().any(|&(f, t)| f == from && t == to)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_legacy_aliases() {
        assert_eq!(JobStatus::normalize("pending"), Some(JobStatus::Queued));
        assert_eq!(JobStatus::normalize("processing"), Some(JobStatus::Running));
        assert_eq!(JobStatus::normalize("completed"), Some(JobStatus::Completed));
        assert_eq!(JobStatus::normalize("bogus"), None);
    }

    #[test]
    fn queue_and_priority_rank_order() {
        let mut queues = vec![Queue::Batch, Queue::Live, Queue::Default];
        queues.sort_by_key(|q| q.rank());
        assert_eq!(queues, vec![Queue::Live, Queue::Default, Queue::Batch]);

        let mut priorities = vec![Priority::Low, Priority::High, Priority::Medium];
        priorities.sort_by_key(|p| p.rank());
        assert_eq!(
            priorities,
            vec![Priority::High, Priority::Medium, Priority::Low]
        );
    }

    #[test]
    fn transition_table_matches_spec() {
        assert!(is_allowed_transition(JobStatus::Queued, JobStatus::Assigned));
        assert!(is_allowed_transition(JobStatus::Retrying, JobStatus::Queued));
        assert!(!is_allowed_transition(JobStatus::Queued, JobStatus::Running));
        assert!(!is_allowed_transition(JobStatus::Completed, JobStatus::Queued));
    }

    #[test]
    fn progress_clamps_to_bounds() {
        assert_eq!(Job::clamp_progress(-5), 0);
        assert_eq!(Job::clamp_progress(150), 100);
        assert_eq!(Job::clamp_progress(42), 42);
    }
}
