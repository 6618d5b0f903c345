//! Job lifecycle types.
//!
//! ```text
//!   submit() ──→ Queued ──→ Running ──→ Completed
//!                  │           │
//!                  │           └──→ Failed(reason)
//!                  │
//!                  └──→ Cancelled
//! ```
//!
//! Transitions only move forward; terminal states are permanent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct JobId(pub String);

impl JobId {
    /// Create a new job ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for JobId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Status of a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum JobStatus {
    /// Accepted, not started.
    Queued,
    /// Shots are executing.
    Running,
    /// All shots finished.
    Completed,
    /// Execution stopped with an error message.
    Failed(String),
    /// Cancelled before completion.
    Cancelled,
}

impl JobStatus {
    /// Check if this is a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobStatus::Completed | JobStatus::Failed(_) | JobStatus::Cancelled
        )
    }

    /// Check if the job completed successfully.
    pub fn is_success(&self) -> bool {
        matches!(self, JobStatus::Completed)
    }

    fn rank(&self) -> u8 {
        match self {
            JobStatus::Queued => 0,
            JobStatus::Running => 1,
            JobStatus::Completed | JobStatus::Failed(_) | JobStatus::Cancelled => 2,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobStatus::Queued => write!(f, "Queued"),
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Completed => write!(f, "Completed"),
            JobStatus::Failed(msg) => write!(f, "Failed: {msg}"),
            JobStatus::Cancelled => write!(f, "Cancelled"),
        }
    }
}

/// A submitted job and its timestamps.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// The job identifier.
    pub id: JobId,
    /// Current status.
    pub status: JobStatus,
    /// Number of shots requested.
    pub shots: u32,
    /// Backend the job was submitted to.
    pub backend: String,
    /// Time the job was created.
    pub created_at: DateTime<Utc>,
    /// Time the job started running.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Time the job reached a terminal state.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

impl Job {
    /// Create a queued job.
    pub fn new(id: JobId, shots: u32, backend: impl Into<String>) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            shots,
            backend: backend.into(),
            created_at: Utc::now(),
            started_at: None,
            finished_at: None,
        }
    }

    /// Move to `status` if that is a forward transition.
    ///
    /// Returns `false` and leaves the job untouched otherwise.
    pub fn transition(&mut self, status: JobStatus) -> bool {
        if self.status.is_terminal() || status.rank() <= self.status.rank() {
            return false;
        }
        let now = Utc::now();
        if matches!(status, JobStatus::Running) {
            self.started_at = Some(now);
        }
        if status.is_terminal() {
            self.finished_at = Some(now);
        }
        self.status = status;
        true
    }

    /// Wall time between start and finish, when both are known.
    pub fn run_time(&self) -> Option<Duration> {
        let start = self.started_at?;
        let end = self.finished_at?;
        (end - start).to_std().ok()
    }
}
