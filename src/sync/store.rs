//! # Durable-store contract.
//!
//! The store is an external collaborator keyed by job id. It accepts the
//! four statuses of its own contract; the in-memory `Canceled` state maps to
//! `FAILED` at this boundary.

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::jobs::{Job, JobId, JobStatus};

/// Errors surfaced by the store or audit collaborators.
///
/// Always treated as best-effort by the core: logged, never retried.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum SyncError {
    /// The collaborator rejected or could not service the call.
    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// Store-facing status labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StoreStatus {
    Queued,
    Running,
    Success,
    Failed,
}

impl From<JobStatus> for StoreStatus {
    fn from(status: JobStatus) -> Self {
        match status {
            JobStatus::Queued => StoreStatus::Queued,
            JobStatus::Running => StoreStatus::Running,
            JobStatus::Success => StoreStatus::Success,
            // The store contract has no cancelled state.
            JobStatus::Failed | JobStatus::Canceled => StoreStatus::Failed,
        }
    }
}

/// One create/update operation against the durable store.
#[derive(Debug, Clone, Serialize)]
pub struct JobStateUpdate {
    /// Job the update is keyed by.
    pub job_id: JobId,
    /// Status per the store contract.
    pub status: StoreStatus,
    /// Set once the job entered `Running`.
    pub started_at: Option<DateTime<Utc>>,
    /// Set once the job reached a terminal state.
    pub finished_at: Option<DateTime<Utc>>,
    /// Failure reason, when the job failed.
    pub error: Option<String>,
    /// Artifact path, when the job succeeded.
    pub zip_path: Option<PathBuf>,
}

impl JobStateUpdate {
    /// Snapshots a job into a store update.
    pub fn from_job(job: &Job) -> Self {
        Self {
            job_id: job.id,
            status: job.status.into(),
            started_at: job.started_at,
            finished_at: job.finished_at,
            error: job.error.clone(),
            zip_path: job.artifact_path.clone(),
        }
    }
}

/// External durable store keyed by job id.
#[async_trait]
pub trait JobStore: Send + Sync + 'static {
    /// Creates or updates the job's durable record.
    async fn upsert(&self, update: JobStateUpdate) -> Result<(), SyncError>;
}

/// Store that mirrors nowhere.
pub struct NoopStore;

#[async_trait]
impl JobStore for NoopStore {
    async fn upsert(&self, _update: JobStateUpdate) -> Result<(), SyncError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_status_serializes_uppercase() {
        let label = serde_json::to_string(&StoreStatus::Queued).unwrap();
        assert_eq!(label, "\"QUEUED\"");
    }

    #[test]
    fn every_in_memory_status_maps_into_the_contract() {
        assert_eq!(StoreStatus::from(JobStatus::Queued), StoreStatus::Queued);
        assert_eq!(StoreStatus::from(JobStatus::Running), StoreStatus::Running);
        assert_eq!(StoreStatus::from(JobStatus::Success), StoreStatus::Success);
        assert_eq!(StoreStatus::from(JobStatus::Failed), StoreStatus::Failed);
        assert_eq!(StoreStatus::from(JobStatus::Canceled), StoreStatus::Failed);
    }
}
