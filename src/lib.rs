//! # fetchvisor
//!
//! **Fetchvisor** is a multi-tenant download-orchestration core for Rust.
//!
//! It manages the full lifecycle of download jobs that are fulfilled by an
//! external command-line executable: admission under per-tenant limits,
//! process supervision with runtime caps and cancellation, live log
//! broadcasting to any number of subscribers, archiving of the output
//! directory, and best-effort mirroring of job state to durable storage.
//! The crate is designed as a building block for API layers and schedulers.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   submit(input, tenant)        status(id)   cancel(id)   subscribe_logs(id)
//!          │                          │            │               │
//!          ▼                          ▼            ▼               ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  JobRegistry (canonical job table)                                    │
//! │  - ContentId extraction (input validation, no record on failure)      │
//! │  - Job records: Queued ─► Running ─► Success | Failed | Canceled      │
//! │  - CancellationToken per job                                          │
//! │  - AdmissionController (per-tenant active counts vs. quota ceilings)  │
//! │  - StateSync (durable store + audit sink, best effort)                │
//! └──────────────┬────────────────────────────────────────────────────────┘
//!                │ tokio::spawn per job
//!                ▼
//!     ┌────────────────────┐      ┌─────────────────────────────────┐
//!     │  runner (pipeline) │─────►│  ProcessSupervisor              │
//!     │  admission ► spawn │      │  - FetchCommand (redacted argv) │
//!     │  ► archive ► final │      │  - stdout/stderr line forwarding│
//!     └─────────┬──────────┘      │  - runtime limit, cancel, kill  │
//!               │                 └──────────────┬──────────────────┘
//!               │ lines                          │ lines
//!               ▼                                ▼
//! ┌───────────────────────────────────────────────────────────────────────┐
//! │  LogBroadcaster (per-job broadcast channel + terminal close flag)     │
//! │  - subscribers attach/detach at any time, each at its own pace        │
//! │  - close is observed after all buffered lines are drained             │
//! └───────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! submit ──► Queued record ──► runner task
//!
//! runner:
//!   ├─► cancelled already?  ──► Canceled (no slot, no process)
//!   ├─► account lookup      ──► Failed(account_not_found)
//!   ├─► quota + admission   ──► Failed(concurrency_limit_exceeded)
//!   ├─► spawn executable, forward output lines to the broadcaster
//!   │     ├─ exit 0         ──► zip output dir ──► Success
//!   │     ├─ exit n ≠ 0     ──► Failed(process_failure)
//!   │     ├─ runtime limit  ──► kill ──► Failed(process_timeout)
//!   │     └─ cancel token   ──► kill ──► Canceled
//!   └─► final log line ► close stream ► terminal status ► mirror ► audit
//!         └─ admission slot released exactly once
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                     |
//! |-----------------|----------------------------------------------------------|----------------------------------------|
//! | **Jobs**        | Submit, query, and cancel download jobs.                 | [`JobRegistry`], [`Job`], [`JobStatus`]|
//! | **Admission**   | Per-tenant concurrency and runtime limits.               | [`TenantQuota`], [`QuotaSource`]       |
//! | **Logs**        | Live per-job output streams with a terminal close.       | [`logs::LogSubscriber`], [`logs::sse`] |
//! | **Accounts**    | Downloader credentials behind a lookup seam.             | [`Account`], [`AccountProvider`]       |
//! | **Persistence** | Best-effort state mirroring and audit events.            | [`JobStore`], [`AuditSink`]            |
//! | **Errors**      | Typed errors with stable labels for every failure mode.  | [`JobError`], [`SubmitError`]          |
//! | **Configuration**| Centralize executable path and runtime defaults.        | [`OrchestratorConfig`]                 |
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use fetchvisor::{
//!     JobRegistry, OrchestratorConfig, StaticAccount, StaticQuotas, TenantQuota,
//!     NoopSink, NoopStore,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut cfg = OrchestratorConfig::default();
//!     cfg.executable = "/usr/local/bin/fetch-client".into();
//!     cfg.downloads_dir = "/var/lib/fetchvisor/downloads".into();
//!
//!     let quotas = StaticQuotas::new().with(
//!         "tenant-a",
//!         TenantQuota {
//!             max_concurrent: Some(2),
//!             max_runtime: Some(Duration::from_secs(3600)),
//!         },
//!     );
//!
//!     let registry = JobRegistry::new(
//!         cfg,
//!         Arc::new(StaticAccount::new("downloader", "s3cret")),
//!         Arc::new(quotas),
//!         Arc::new(NoopStore),
//!         Arc::new(NoopSink),
//!     );
//!
//!     let job = registry
//!         .submit("https://example.com/title?id=2234989491", "tenant-a")
//!         .await?;
//!     println!("queued {} for content {}", job.id, job.content_id);
//!
//!     let mut logs = registry.subscribe_logs(job.id).await.ok_or("unknown job")?;
//!     while let fetchvisor::logs::LogChunk::Data(line) = logs.recv().await {
//!         println!("{line}");
//!     }
//!     Ok(())
//! }
//! ```

mod accounts;
mod admission;
mod archive;
mod config;
mod content;
mod core;
mod error;
mod jobs;
mod process;
mod sync;

pub mod logs;

// ---- Public re-exports ----

pub use accounts::{Account, AccountProvider, StaticAccount};
pub use admission::{QuotaSource, StaticQuotas, TenantQuota};
pub use archive::ArchiveError;
pub use config::OrchestratorConfig;
pub use content::ContentId;
pub use core::JobRegistry;
pub use error::{CancelError, JobError, SubmitError, TerminationReason};
pub use jobs::{Job, JobId, JobStatus};
pub use process::{ExitOutcome, FetchCommand, ProcessSupervisor};
pub use sync::{
    AuditAction, AuditEvent, AuditSink, JobStateUpdate, JobStore, NoopSink, NoopStore, StateSync,
    StoreStatus, SyncError,
};
