//! Best-effort mirroring of job state to a durable store and an audit sink.

mod audit;
mod store;

pub use audit::{AuditAction, AuditEvent, AuditSink, NoopSink};
pub use store::{JobStateUpdate, JobStore, NoopStore, StoreStatus, SyncError};

use std::sync::Arc;

use tracing::warn;

use crate::jobs::Job;

/// Bundles the two external collaborators and applies the best-effort policy:
/// failures are logged and dropped, never retried, and never allowed to
/// block or alter job progress. The in-memory registry stays the source of
/// truth for the life of the process.
#[derive(Clone)]
pub struct StateSync {
    store: Arc<dyn JobStore>,
    audit: Arc<dyn AuditSink>,
}

impl StateSync {
    /// Creates a sync layer over the given collaborators.
    pub fn new(store: Arc<dyn JobStore>, audit: Arc<dyn AuditSink>) -> Self {
        Self { store, audit }
    }

    /// Mirrors the job's current state to the durable store.
    pub async fn mirror(&self, job: &Job) {
        let update = JobStateUpdate::from_job(job);
        if let Err(e) = self.store.upsert(update).await {
            warn!(job = %job.id, error = %e, "durable store update failed");
        }
    }

    /// Emits one audit event for the job.
    pub async fn audit(&self, job: &Job, action: AuditAction, details: serde_json::Value) {
        let event = AuditEvent {
            action,
            tenant_id: job.tenant_id.clone(),
            details,
        };
        if let Err(e) = self.audit.record(event).await {
            warn!(job = %job.id, error = %e, "audit sink write failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::ContentId;
    use crate::jobs::JobStatus;
    use async_trait::async_trait;
    use std::path::PathBuf;
    use std::sync::Mutex;

    struct FailingStore;

    #[async_trait]
    impl JobStore for FailingStore {
        async fn upsert(&self, _update: JobStateUpdate) -> Result<(), SyncError> {
            Err(SyncError::Unavailable("store down".into()))
        }
    }

    struct RecordingSink {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, event: AuditEvent) -> Result<(), SyncError> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }
    }

    fn job() -> Job {
        Job::new(
            ContentId::extract("12345678").unwrap(),
            "tenant-a",
            PathBuf::from("/tmp/x"),
        )
    }

    #[tokio::test]
    async fn store_failure_is_swallowed() {
        let sync = StateSync::new(Arc::new(FailingStore), Arc::new(NoopSink));
        // Must not panic or propagate.
        sync.mirror(&job()).await;
    }

    #[tokio::test]
    async fn audit_event_carries_action_and_tenant() {
        let sink = Arc::new(RecordingSink {
            events: Mutex::new(Vec::new()),
        });
        let sync = StateSync::new(Arc::new(NoopStore), sink.clone());

        sync.audit(
            &job(),
            AuditAction::DownloadStarted,
            serde_json::json!({ "content_id": "12345678" }),
        )
        .await;

        let events = sink.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::DownloadStarted);
        assert_eq!(events[0].tenant_id, "tenant-a");
    }

    #[test]
    fn canceled_maps_to_failed_in_the_store_contract() {
        let mut j = job();
        j.mark_failed(&crate::error::JobError::ProcessTerminated {
            reason: crate::error::TerminationReason::Cancelled,
        });
        assert_eq!(j.status, JobStatus::Canceled);
        let update = JobStateUpdate::from_job(&j);
        assert_eq!(update.status, StoreStatus::Failed);
    }
}
