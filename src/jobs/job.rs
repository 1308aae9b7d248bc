//! # Job record and status state machine.
//!
//! A [`Job`] is the unit of work: one admitted download fulfilled by one
//! external process. The registry hands out clones as snapshots; only the
//! registry mutates the canonical copy.
//!
//! ## State machine
//! ```text
//! Queued ──► Running ──► Success
//!    │          │  └────► Failed
//!    └──────────┴───────► Canceled
//! ```
//!
//! ## Rules
//! - Transitions are **monotonic**: nothing ever leaves a terminal state.
//! - `started_at` is set exactly once, on entry into `Running`.
//! - `finished_at` is set exactly once, iff the status is terminal.
//! - `error` is set exactly once, only on `Failed`.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::content::ContentId;
use crate::error::JobError;

/// Opaque unique job identifier, generated at creation.
pub type JobId = Uuid;

/// Lifecycle status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Created and registered; execution not yet admitted.
    Queued,
    /// Admitted; the external process is live.
    Running,
    /// Process exited zero and the artifact was created.
    Success,
    /// Any failure path, including archive failure after a clean exit.
    Failed,
    /// Explicitly cancelled before or during execution.
    Canceled,
}

impl JobStatus {
    /// True for states no transition may leave.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            JobStatus::Success | JobStatus::Failed | JobStatus::Canceled
        )
    }
}

/// Canonical in-memory record for one download job.
///
/// The registry owns the canonical copy; [`status`](crate::JobRegistry::status)
/// returns clones so callers can inspect the last known state even after the
/// job's runner task has exited.
#[derive(Debug, Clone)]
pub struct Job {
    /// Unique identifier, generated at creation.
    pub id: JobId,
    /// Normalized external content identifier.
    pub content_id: ContentId,
    /// Owning identity (API key) under whose quota the job runs.
    pub tenant_id: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// Directory the external process writes into.
    pub output_dir: PathBuf,
    /// Packaged artifact path; set only on `Success`.
    pub artifact_path: Option<PathBuf>,
    /// Set once, on entry into `Running`.
    pub started_at: Option<DateTime<Utc>>,
    /// Set once, iff the status is terminal.
    pub finished_at: Option<DateTime<Utc>>,
    /// Human-readable failure reason; set once, only on `Failed`.
    pub error: Option<String>,
}

impl Job {
    /// Creates a fresh `Queued` job.
    pub fn new(content_id: ContentId, tenant_id: impl Into<String>, output_dir: PathBuf) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_id,
            tenant_id: tenant_id.into(),
            status: JobStatus::Queued,
            output_dir,
            artifact_path: None,
            started_at: None,
            finished_at: None,
            error: None,
        }
    }

    /// Marks the job `Running` and stamps `started_at`.
    ///
    /// Returns `false` (and changes nothing) if the job is not `Queued`.
    pub(crate) fn mark_running(&mut self) -> bool {
        if self.status != JobStatus::Queued {
            return false;
        }
        self.status = JobStatus::Running;
        self.started_at = Some(Utc::now());
        true
    }

    /// Marks the job `Success` with its artifact path and stamps `finished_at`.
    ///
    /// Returns `false` (and changes nothing) if the job is already terminal.
    pub(crate) fn mark_success(&mut self, artifact: PathBuf) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        self.status = JobStatus::Success;
        self.artifact_path = Some(artifact);
        self.finished_at = Some(Utc::now());
        true
    }

    /// Marks the job terminal for the given failure.
    ///
    /// Cancellations resolve to `Canceled`; everything else resolves to
    /// `Failed` with the error message recorded. Returns `false` (and changes
    /// nothing) if the job is already terminal.
    pub(crate) fn mark_failed(&mut self, err: &JobError) -> bool {
        if self.status.is_terminal() {
            return false;
        }
        if err.is_cancellation() {
            self.status = JobStatus::Canceled;
        } else {
            self.status = JobStatus::Failed;
            self.error = Some(err.as_message());
        }
        self.finished_at = Some(Utc::now());
        true
    }
}
