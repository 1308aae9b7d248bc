//! # Job registry: the canonical in-memory state machine for every job.
//!
//! The registry owns the job table and everything needed to act on a job:
//! its cancellation token, its log stream (via the broadcaster), and the
//! collaborator seams the runner consults. Submission registers a `Queued`
//! record synchronously and spawns the runner task; the call never blocks on
//! the external process.
//!
//! ## Architecture
//! ```text
//! submit(input, tenant)
//!   ├─► ContentId::extract  ──► SubmitError::InvalidIdentifier (no record)
//!   ├─► Job::new (Queued), insert into table
//!   ├─► LogBroadcaster::publish
//!   ├─► StateSync::mirror (QUEUED)
//!   └─► tokio::spawn(run_job)         ──► returns snapshot immediately
//!
//! cancel(id)   ──► CancellationToken::cancel  (no-op when terminal)
//! status(id)   ──► snapshot clone (retained for process lifetime)
//! ```
//!
//! ## Rules
//! - Transitions go through [`mark_running`](JobRegistry::mark_running) /
//!   [`finalize_success`](JobRegistry::finalize_success) /
//!   [`finalize_failure`](JobRegistry::finalize_failure), which enforce
//!   monotonicity; a terminal record never changes again.
//! - Job records are never evicted; `status` answers after completion.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::accounts::AccountProvider;
use crate::admission::{AdmissionController, QuotaSource};
use crate::config::OrchestratorConfig;
use crate::content::ContentId;
use crate::core::runner;
use crate::error::{CancelError, JobError, SubmitError};
use crate::jobs::{Job, JobId};
use crate::logs::{LogBroadcaster, LogSubscriber};
use crate::process::ProcessSupervisor;
use crate::sync::{AuditSink, JobStore, StateSync};

/// Everything the registry holds per job.
struct JobEntry {
    job: Job,
    cancel: CancellationToken,
}

/// Canonical registry of download jobs.
pub struct JobRegistry {
    pub(super) cfg: OrchestratorConfig,
    pub(super) admission: AdmissionController,
    pub(super) broadcaster: Arc<LogBroadcaster>,
    pub(super) supervisor: ProcessSupervisor,
    pub(super) accounts: Arc<dyn AccountProvider>,
    pub(super) quotas: Arc<dyn QuotaSource>,
    pub(super) sync: StateSync,
    jobs: RwLock<HashMap<JobId, JobEntry>>,
}

impl JobRegistry {
    /// Creates a registry wired to its collaborators.
    pub fn new(
        cfg: OrchestratorConfig,
        accounts: Arc<dyn AccountProvider>,
        quotas: Arc<dyn QuotaSource>,
        store: Arc<dyn JobStore>,
        audit: Arc<dyn AuditSink>,
    ) -> Arc<Self> {
        let broadcaster = Arc::new(LogBroadcaster::new(cfg.log_capacity));
        Arc::new(Self {
            supervisor: ProcessSupervisor::new(broadcaster.clone()),
            broadcaster,
            admission: AdmissionController::new(),
            accounts,
            quotas,
            sync: StateSync::new(store, audit),
            cfg,
            jobs: RwLock::new(HashMap::new()),
        })
    }

    /// Creates a `Queued` job and schedules its execution.
    ///
    /// Identifier extraction failures are raised here, before any record
    /// exists. On success the returned snapshot is already registered and a
    /// runner task has been spawned; the call does not wait for admission or
    /// the process.
    pub async fn submit(
        self: &Arc<Self>,
        raw_input: &str,
        tenant_id: &str,
    ) -> Result<Job, SubmitError> {
        let content_id = ContentId::extract(raw_input)?;
        let output_dir = self.cfg.downloads_dir.join(content_id.as_str());
        let job = Job::new(content_id, tenant_id, output_dir);
        let job_id = job.id;
        let cancel = CancellationToken::new();

        {
            let mut jobs = self.jobs.write().await;
            jobs.insert(
                job_id,
                JobEntry {
                    job: job.clone(),
                    cancel: cancel.clone(),
                },
            );
        }
        self.broadcaster.publish(job_id).await;
        self.sync.mirror(&job).await;

        info!(job = %job_id, tenant = tenant_id, content = %job.content_id, "job queued");

        let registry = self.clone();
        tokio::spawn(runner::run_job(registry, job_id, cancel));

        Ok(job)
    }

    /// Last known snapshot of a job; `None` when the id was never registered.
    pub async fn status(&self, job_id: JobId) -> Option<Job> {
        let jobs = self.jobs.read().await;
        jobs.get(&job_id).map(|e| e.job.clone())
    }

    /// Requests termination of a non-terminal job.
    ///
    /// Terminal jobs are a no-op. A `Queued` job that has not been admitted
    /// resolves to `Canceled` at the runner's next safe point without ever
    /// spawning a process.
    pub async fn cancel(&self, job_id: JobId) -> Result<(), CancelError> {
        let jobs = self.jobs.read().await;
        let entry = jobs.get(&job_id).ok_or(CancelError::NotFound)?;
        if entry.job.status.is_terminal() {
            return Ok(());
        }
        entry.cancel.cancel();
        Ok(())
    }

    /// Subscribes to a job's live log stream; `None` for unknown ids.
    pub async fn subscribe_logs(&self, job_id: JobId) -> Option<LogSubscriber> {
        self.broadcaster.subscribe(job_id).await
    }

    /// Live-job count for a tenant, as seen by the admission controller.
    pub async fn active_count(&self, tenant_id: &str) -> usize {
        self.admission.active_count(tenant_id).await
    }

    // ---------------------------
    // Runner-facing state mutation
    // ---------------------------

    /// Transitions `Queued -> Running`; returns the snapshot, or `None` when
    /// the transition was not legal (already terminal).
    pub(super) async fn mark_running(&self, job_id: JobId) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(&job_id)?;
        entry.job.mark_running().then(|| entry.job.clone())
    }

    /// Transitions into `Success` with the artifact path.
    pub(super) async fn finalize_success(&self, job_id: JobId, artifact: PathBuf) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(&job_id)?;
        entry.job.mark_success(artifact).then(|| entry.job.clone())
    }

    /// Transitions into `Failed` or `Canceled` for the given error.
    pub(super) async fn finalize_failure(&self, job_id: JobId, err: &JobError) -> Option<Job> {
        let mut jobs = self.jobs.write().await;
        let entry = jobs.get_mut(&job_id)?;
        entry.job.mark_failed(err).then(|| entry.job.clone())
    }
}
