//! Error types used by the fetchvisor orchestration core.
//!
//! This module defines the caller-facing and job-facing error enums:
//!
//! - [`SubmitError`]: submission rejected before any job record exists.
//! - [`CancelError`]: cancellation request could not be routed.
//! - [`JobError`]: failure reasons recorded on a job that already exists.
//!
//! [`JobError`] provides helper methods (`as_label`, `as_message`) so the same
//! taxonomy can feed the job record, the durable store, and the log stream
//! with stable snake_case labels.

use std::time::Duration;
use thiserror::Error;

/// # Errors raised before a job is created.
///
/// These are returned synchronously from [`JobRegistry::submit`](crate::JobRegistry::submit)
/// and never leave a trace in the registry.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmitError {
    /// The input contained no run of 8-12 decimal digits.
    #[error("no 8-12 digit content identifier found in input")]
    InvalidIdentifier,
}

/// # Errors raised by cancellation requests.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CancelError {
    /// No job with the given id is known to the registry.
    #[error("job not found")]
    NotFound,
}

/// Why a live process was terminated before exiting on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationReason {
    /// The tenant's `max_runtime` limit elapsed.
    Timeout {
        /// The configured runtime limit that was exceeded.
        limit: Duration,
    },
    /// An explicit cancel request was received.
    Cancelled,
}

/// # Failure reasons recorded on a job.
///
/// Every variant is written to the job's `error` field, mirrored to the
/// durable store, and appended as a line to the job's log stream. None of
/// them crash the orchestrating process, and none are retried automatically.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// No account could be resolved for the tenant.
    #[error("no account available for tenant '{tenant}'")]
    AccountNotFound {
        /// Tenant whose account lookup failed.
        tenant: String,
    },

    /// The external executable was not found on disk.
    #[error("executable not found: {path}")]
    ExecutableMissing {
        /// Configured executable path that failed the existence check.
        path: String,
    },

    /// The tenant was already at its concurrency ceiling.
    #[error("concurrency limit exceeded: {active}/{ceiling} jobs active")]
    ConcurrencyLimitExceeded {
        /// Active jobs at the time of the admission check.
        active: usize,
        /// Configured ceiling for the tenant.
        ceiling: usize,
    },

    /// The process could not be spawned at all.
    #[error("failed to spawn process: {detail}")]
    SpawnFailed {
        /// Underlying OS error message.
        detail: String,
    },

    /// The process ran to completion with a non-zero exit code.
    #[error("process exited with code {exit_code}")]
    ProcessFailure {
        /// Exit code reported by the OS, recorded verbatim.
        exit_code: i32,
    },

    /// The process was terminated before exiting on its own.
    #[error("process terminated: {}", match .reason {
        TerminationReason::Timeout { limit } => format!("runtime limit of {limit:?} exceeded"),
        TerminationReason::Cancelled => "cancelled by user".to_string(),
    })]
    ProcessTerminated {
        /// Whether termination came from the runtime limit or a cancel request.
        reason: TerminationReason,
    },

    /// The process succeeded but its output could not be packaged.
    #[error("archive creation failed: {detail}")]
    ArchiveCreationFailed {
        /// Underlying archiving error message.
        detail: String,
    },
}

impl JobError {
    /// Returns a short stable label (snake_case) for use in logs and the store.
    ///
    /// # Example
    /// ```
    /// use fetchvisor::JobError;
    ///
    /// let err = JobError::ProcessFailure { exit_code: 1 };
    /// assert_eq!(err.as_label(), "process_failure");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::AccountNotFound { .. } => "account_not_found",
            JobError::ExecutableMissing { .. } => "executable_missing",
            JobError::ConcurrencyLimitExceeded { .. } => "concurrency_limit_exceeded",
            JobError::SpawnFailed { .. } => "process_spawn_failed",
            JobError::ProcessFailure { .. } => "process_failure",
            JobError::ProcessTerminated { reason } => match reason {
                TerminationReason::Timeout { .. } => "process_timeout",
                TerminationReason::Cancelled => "process_cancelled",
            },
            JobError::ArchiveCreationFailed { .. } => "archive_creation_failed",
        }
    }

    /// Returns a human-readable message suitable for the job record.
    pub fn as_message(&self) -> String {
        self.to_string()
    }

    /// True when the failure reason is an explicit user cancellation.
    pub fn is_cancellation(&self) -> bool {
        matches!(
            self,
            JobError::ProcessTerminated {
                reason: TerminationReason::Cancelled
            }
        )
    }
}
