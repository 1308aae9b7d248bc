//! # Per-job runner: one job's pipeline from admission to finalization.
//!
//! One runner task is spawned per submitted job. It consults the
//! collaborators in a fixed order, supervises the process, and reconciles
//! the terminal state.
//!
//! ## Flow
//! ```text
//! run_job
//!   ├─► cancelled already?        ──► Canceled (no slot taken, no process)
//!   ├─► account lookup            ──► Failed(account_not_found)
//!   ├─► quota + try_admit         ──► Failed(concurrency_limit_exceeded)
//!   │     └─ admitted: slot released exactly once in finalize
//!   ├─► executable on disk?       ──► Failed(executable_missing)
//!   ├─► mark Running, mirror, audit(download_started)
//!   ├─► ProcessSupervisor::run
//!   │     ├─ Code(0)   ──► archive ──► Success │ Failed(archive_creation_failed)
//!   │     ├─ Code(n)   ──► Failed(process_failure)
//!   │     └─ Terminated ─► Failed(timeout) │ Canceled
//!   └─► finalize: log line ► close stream ► status ► mirror ► audit ► release
//! ```
//!
//! ## Rules
//! - Every failure is local to the job; the runner never panics the runtime.
//! - The log stream closes after the last line and **before** the terminal
//!   status is published, so observers always see output before completion.
//! - The admission slot is released exactly once, and only if it was taken.

use std::path::PathBuf;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::registry::JobRegistry;
use crate::admission::AdmissionError;
use crate::archive::archive_output;
use crate::error::{JobError, TerminationReason};
use crate::jobs::{Job, JobId};
use crate::process::{ExitOutcome, FetchCommand};
use crate::sync::AuditAction;

/// Drives one job to a terminal state. Spawned by
/// [`JobRegistry::submit`](crate::JobRegistry::submit).
pub(super) async fn run_job(registry: Arc<JobRegistry>, job_id: JobId, cancel: CancellationToken) {
    let Some(job) = registry.status(job_id).await else {
        error!(job = %job_id, "runner started for unregistered job");
        return;
    };

    let mut admitted = false;
    let result = execute(&registry, &job, &cancel, &mut admitted).await;
    finalize(&registry, &job, result, admitted).await;
}

/// Runs the pipeline up to an artifact path or the first failure.
///
/// Sets `admitted` the moment a slot is taken so the caller can release it
/// on every path, including failures further down the pipeline.
async fn execute(
    registry: &JobRegistry,
    job: &Job,
    cancel: &CancellationToken,
    admitted: &mut bool,
) -> Result<PathBuf, JobError> {
    // A cancel that lands before admission must resolve the job without
    // taking a slot or spawning anything.
    if cancel.is_cancelled() {
        registry
            .broadcaster
            .write_line(job.id, "cancelled by user")
            .await;
        return Err(JobError::ProcessTerminated {
            reason: TerminationReason::Cancelled,
        });
    }

    let account = registry
        .accounts
        .account_for(&job.tenant_id)
        .await
        .ok_or_else(|| JobError::AccountNotFound {
            tenant: job.tenant_id.clone(),
        })?;

    let quota = registry.quotas.quota(&job.tenant_id).await;
    let ceiling = quota
        .max_concurrent
        .unwrap_or(registry.cfg.default_max_concurrent);
    registry
        .admission
        .try_admit(&job.tenant_id, ceiling)
        .await
        .map_err(|e| match e {
            AdmissionError::LimitExceeded { active, ceiling } => {
                JobError::ConcurrencyLimitExceeded { active, ceiling }
            }
        })?;
    *admitted = true;

    // Last check before anything touches the filesystem; a cancel that landed
    // during the lookups above must not spawn a process.
    if cancel.is_cancelled() {
        registry
            .broadcaster
            .write_line(job.id, "cancelled by user")
            .await;
        return Err(JobError::ProcessTerminated {
            reason: TerminationReason::Cancelled,
        });
    }

    let executable_present = tokio::fs::try_exists(&registry.cfg.executable)
        .await
        .unwrap_or(false);
    if !executable_present {
        return Err(JobError::ExecutableMissing {
            path: registry.cfg.executable.display().to_string(),
        });
    }

    tokio::fs::create_dir_all(&job.output_dir)
        .await
        .map_err(|e| JobError::SpawnFailed {
            detail: format!("creating output directory: {e}"),
        })?;

    // A record that is no longer `Queued` here was cancelled in the window
    // between admission and start.
    let running = registry
        .mark_running(job.id)
        .await
        .ok_or(JobError::ProcessTerminated {
            reason: TerminationReason::Cancelled,
        })?;
    registry.sync.mirror(&running).await;
    registry
        .sync
        .audit(
            &running,
            AuditAction::DownloadStarted,
            serde_json::json!({
                "job_id": job.id,
                "content_id": job.content_id.as_str(),
            }),
        )
        .await;
    info!(job = %job.id, tenant = %job.tenant_id, "job running");

    let cmd = FetchCommand::new(
        registry.cfg.executable.clone(),
        job.content_id.clone(),
        registry.cfg.verify_all,
        account.username,
        account.secret,
        job.output_dir.clone(),
    );

    match registry
        .supervisor
        .run(job.id, &cmd, quota.max_runtime, cancel)
        .await?
    {
        ExitOutcome::Code(0) => archive_output(&job.output_dir).await.map_err(|e| {
            JobError::ArchiveCreationFailed {
                detail: e.to_string(),
            }
        }),
        ExitOutcome::Code(code) => Err(JobError::ProcessFailure { exit_code: code }),
        ExitOutcome::Terminated(reason) => Err(JobError::ProcessTerminated { reason }),
    }
}

/// Reconciles the terminal state: log, close, transition, mirror, audit,
/// release.
async fn finalize(
    registry: &JobRegistry,
    job: &Job,
    result: Result<PathBuf, JobError>,
    admitted: bool,
) {
    let final_job = match &result {
        Ok(artifact) => {
            registry
                .broadcaster
                .write_line(job.id, format!("artifact created: {}", artifact.display()))
                .await;
            registry.broadcaster.close(job.id).await;
            registry.finalize_success(job.id, artifact.clone()).await
        }
        Err(err) => {
            // The cancel line is already in the stream; everything else gets
            // its reason appended.
            if !err.is_cancellation() {
                registry
                    .broadcaster
                    .write_line(job.id, err.as_message())
                    .await;
            }
            registry.broadcaster.close(job.id).await;
            registry.finalize_failure(job.id, err).await
        }
    };

    let Some(final_job) = final_job else {
        warn!(job = %job.id, "job was already terminal during finalization");
        if admitted {
            registry.admission.release(&job.tenant_id).await;
        }
        return;
    };

    registry.sync.mirror(&final_job).await;
    let (action, details) = match &result {
        Ok(artifact) => (
            AuditAction::DownloadCompleted,
            serde_json::json!({
                "job_id": job.id,
                "content_id": job.content_id.as_str(),
                "zip_path": artifact.display().to_string(),
            }),
        ),
        Err(err) => (
            AuditAction::DownloadFailed,
            serde_json::json!({
                "job_id": job.id,
                "content_id": job.content_id.as_str(),
                "reason": err.as_label(),
            }),
        ),
    };
    registry.sync.audit(&final_job, action, details).await;

    if admitted {
        registry.admission.release(&job.tenant_id).await;
    }

    match &result {
        Ok(_) => info!(job = %job.id, "job succeeded"),
        Err(err) => info!(job = %job.id, reason = err.as_label(), "job finished without success"),
    }
}
