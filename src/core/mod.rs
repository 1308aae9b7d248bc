//! Orchestration core: the job registry and the per-job runner.
//!
//! This module contains the canonical job table and the execution pipeline.
//! The only public API from this module is [`JobRegistry`].
//!
//! Internal modules:
//! - [`registry`]: job table, submit/status/cancel, state mutation;
//! - [`runner`]: one job's pipeline from admission to finalization.

mod registry;
mod runner;

pub use registry::JobRegistry;


#[cfg(all(test, unix))]
mod pipeline_tests {
    use std::fs;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use async_trait::async_trait;

    use crate::accounts::StaticAccount;
    use crate::admission::{StaticQuotas, TenantQuota};
    use crate::config::OrchestratorConfig;
    use crate::jobs::JobStatus;
    use crate::logs::{LogChunk, LogSubscriber};
    use crate::sync::{
        AuditAction, AuditEvent, AuditSink, JobStateUpdate, JobStore, NoopSink, StoreStatus,
        SyncError,
    };

    use super::tests::{init_tracing, registry_with, wait_for, wait_terminal};
    use super::JobRegistry;

    fn script(dir: &Path, body: &str) -> PathBuf {
        let path = dir.join("fetch-stub.sh");
        fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    async fn drain(mut sub: LogSubscriber) -> Vec<String> {
        let mut lines = Vec::new();
        loop {
            match tokio::time::timeout(Duration::from_secs(10), sub.recv())
                .await
                .unwrap()
            {
                LogChunk::Data(line) => lines.push(line),
                LogChunk::Closed => return lines,
            }
        }
    }

    #[tokio::test]
    async fn successful_job_archives_output_and_removes_the_workdir() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "echo downloading\nprintf payload > media.bin\nexit 0");
        let downloads = dir.path().join("downloads");
        let registry = registry_with(exe, downloads.clone(), TenantQuota::default());

        let job = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        let done = wait_terminal(&registry, job.id).await;

        assert_eq!(done.status, JobStatus::Success);
        assert!(done.error.is_none());
        assert!(done.started_at.is_some() && done.finished_at.is_some());

        let artifact = done.artifact_path.unwrap();
        assert_eq!(artifact, downloads.join("2234989491.zip"));
        assert!(fs::metadata(&artifact).unwrap().len() > 0);
        assert!(!downloads.join("2234989491").exists());
        assert_eq!(registry.active_count("tenant-a").await, 0);
    }

    #[tokio::test]
    async fn nonzero_exit_fails_the_job_with_the_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "echo boom >&2\nexit 3");
        let downloads = dir.path().join("downloads");
        let registry = registry_with(exe, downloads.clone(), TenantQuota::default());

        let job = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        let done = wait_terminal(&registry, job.id).await;

        assert_eq!(done.status, JobStatus::Failed);
        assert!(done.error.as_deref().unwrap().contains("exit code 3"));
        assert!(done.artifact_path.is_none());
        assert!(!downloads.join("2234989491.zip").exists());
    }

    #[tokio::test]
    async fn archive_failure_downgrades_a_clean_exit_to_failed() {
        let dir = tempfile::tempdir().unwrap();
        // Exits 0 but removes its own output directory first, so there is
        // nothing left to package.
        let exe = script(dir.path(), "cd /\nrm -rf \"$OLDPWD\"\nexit 0");
        let downloads = dir.path().join("downloads");
        let registry = registry_with(exe, downloads.clone(), TenantQuota::default());

        let job = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        let done = wait_terminal(&registry, job.id).await;

        assert_eq!(done.status, JobStatus::Failed);
        assert!(done
            .error
            .as_deref()
            .unwrap()
            .contains("archive creation failed"));
        assert!(done.artifact_path.is_none());
        assert!(!downloads.join("2234989491.zip").exists());
        assert_eq!(registry.active_count("tenant-a").await, 0);
    }

    #[tokio::test]
    async fn concurrency_ceiling_rejects_until_a_slot_frees_up() {
        let dir = tempfile::tempdir().unwrap();
        // `exec` so dash replaces itself with sleep instead of forking a
        // grandchild that would outlive the supervisor's direct-child kill.
        let exe = script(dir.path(), "exec sleep 30");
        let registry = registry_with(
            exe,
            dir.path().join("downloads"),
            TenantQuota {
                max_concurrent: Some(1),
                max_runtime: None,
            },
        );

        let first = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        wait_for(&registry, first.id, |j| j.status == JobStatus::Running).await;

        let second = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        let rejected = wait_terminal(&registry, second.id).await;
        assert_eq!(rejected.status, JobStatus::Failed);
        assert!(rejected
            .error
            .as_deref()
            .unwrap()
            .contains("concurrency limit exceeded"));

        registry.cancel(first.id).await.unwrap();
        let cancelled = wait_terminal(&registry, first.id).await;
        assert_eq!(cancelled.status, JobStatus::Canceled);
        assert!(cancelled.error.is_none());

        // The slot is free again: a third submission is admitted.
        let third = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        wait_for(&registry, third.id, |j| j.status == JobStatus::Running).await;
        registry.cancel(third.id).await.unwrap();
        wait_terminal(&registry, third.id).await;
    }

    #[tokio::test]
    async fn runtime_limit_terminates_a_stuck_process() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "exec sleep 30");
        let registry = registry_with(
            exe,
            dir.path().join("downloads"),
            TenantQuota {
                max_concurrent: None,
                max_runtime: Some(Duration::from_millis(200)),
            },
        );

        let started = Instant::now();
        let job = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        let done = wait_terminal(&registry, job.id).await;

        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(done.status, JobStatus::Failed);
        assert!(done.error.as_deref().unwrap().contains("runtime limit"));
    }

    #[tokio::test]
    async fn cancelling_a_running_job_writes_one_cancel_line() {
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "echo started\nexec sleep 30");
        let registry = registry_with(exe, dir.path().join("downloads"), TenantQuota::default());

        let job = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        let sub = registry.subscribe_logs(job.id).await.unwrap();
        wait_for(&registry, job.id, |j| j.status == JobStatus::Running).await;

        registry.cancel(job.id).await.unwrap();
        let done = wait_terminal(&registry, job.id).await;
        assert_eq!(done.status, JobStatus::Canceled);
        assert!(done.error.is_none());
        assert!(done.finished_at.is_some());

        let lines = drain(sub).await;
        let cancel_lines = lines.iter().filter(|l| *l == "cancelled by user").count();
        assert_eq!(cancel_lines, 1);
    }

    struct RecordingStore {
        updates: Mutex<Vec<JobStateUpdate>>,
    }

    #[async_trait]
    impl JobStore for RecordingStore {
        async fn upsert(&self, update: JobStateUpdate) -> Result<(), SyncError> {
            self.updates.lock().unwrap().push(update);
            Ok(())
        }
    }

    struct RecordingSink {
        actions: Mutex<Vec<AuditAction>>,
    }

    #[async_trait]
    impl AuditSink for RecordingSink {
        async fn record(&self, event: AuditEvent) -> Result<(), SyncError> {
            self.actions.lock().unwrap().push(event.action);
            Ok(())
        }
    }

    #[tokio::test]
    async fn store_and_audit_observe_the_full_lifecycle() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "printf payload > media.bin\nexit 0");
        let store = Arc::new(RecordingStore {
            updates: Mutex::new(Vec::new()),
        });
        let sink = Arc::new(RecordingSink {
            actions: Mutex::new(Vec::new()),
        });
        let cfg = OrchestratorConfig {
            executable: exe,
            downloads_dir: dir.path().join("downloads"),
            ..OrchestratorConfig::default()
        };
        let registry = JobRegistry::new(
            cfg,
            Arc::new(StaticAccount::new("downloader", "hunter2")),
            Arc::new(StaticQuotas::new()),
            store.clone(),
            sink.clone(),
        );

        let job = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        wait_terminal(&registry, job.id).await;

        let statuses: Vec<StoreStatus> = store
            .updates
            .lock()
            .unwrap()
            .iter()
            .map(|u| u.status)
            .collect();
        assert_eq!(
            statuses,
            vec![StoreStatus::Queued, StoreStatus::Running, StoreStatus::Success]
        );
        let last = store.updates.lock().unwrap().last().cloned().unwrap();
        assert!(last.zip_path.is_some());

        let actions = sink.actions.lock().unwrap().clone();
        assert_eq!(
            actions,
            vec![AuditAction::DownloadStarted, AuditAction::DownloadCompleted]
        );
    }

    #[tokio::test]
    async fn canceled_jobs_are_mirrored_as_failed() {
        init_tracing();
        let dir = tempfile::tempdir().unwrap();
        let exe = script(dir.path(), "exec sleep 30");
        let store = Arc::new(RecordingStore {
            updates: Mutex::new(Vec::new()),
        });
        let cfg = OrchestratorConfig {
            executable: exe,
            downloads_dir: dir.path().join("downloads"),
            ..OrchestratorConfig::default()
        };
        let registry = JobRegistry::new(
            cfg,
            Arc::new(StaticAccount::new("downloader", "hunter2")),
            Arc::new(StaticQuotas::new()),
            store.clone(),
            Arc::new(NoopSink),
        );

        let job = registry.submit("id=2234989491", "tenant-a").await.unwrap();
        wait_for(&registry, job.id, |j| j.status == JobStatus::Running).await;
        registry.cancel(job.id).await.unwrap();
        let done = wait_terminal(&registry, job.id).await;
        assert_eq!(done.status, JobStatus::Canceled);

        let last = store.updates.lock().unwrap().last().cloned().unwrap();
        assert_eq!(last.status, StoreStatus::Failed);
    }
}
