//! # Process supervisor: one external process, supervised to a single outcome.
//!
//! Spawns the downloader with piped stdout/stderr, forwards every output
//! line into the job's log stream, and races process exit against the
//! runtime limit and the job's cancellation token.
//!
//! ## Flow
//! ```text
//! spawn ──► forward stdout ──┐
//!       ──► forward stderr ──┼──► LogBroadcaster::write_line
//!                            │
//! select! {                  │
//!   exit      ──► ExitOutcome::Code(code)
//!   timeout   ──► log line ──► kill ──► Terminated(Timeout)
//!   cancelled ──► log line ──► kill ──► Terminated(Cancelled)
//! }
//! ```
//!
//! ## Rules
//! - Exactly **one** [`ExitOutcome`] per process.
//! - The timeout line is written to the stream **before** termination is requested.
//! - Both forwarders are joined before returning, so every byte the process
//!   produced is in the stream when the caller closes it.
//! - `kill_on_drop` backstops the kill path; a dropped supervisor future
//!   cannot leak a live process.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::command::FetchCommand;
use crate::error::{JobError, TerminationReason};
use crate::jobs::JobId;
use crate::logs::LogBroadcaster;

/// Terminal outcome of one supervised process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    /// The process exited on its own with this code.
    Code(i32),
    /// The process was terminated by the supervisor.
    Terminated(TerminationReason),
}

/// Supervises external downloader processes and feeds their output into the
/// log broadcaster.
pub struct ProcessSupervisor {
    broadcaster: std::sync::Arc<LogBroadcaster>,
}

impl ProcessSupervisor {
    /// Creates a supervisor writing into the given broadcaster.
    pub fn new(broadcaster: std::sync::Arc<LogBroadcaster>) -> Self {
        Self { broadcaster }
    }

    /// Runs one process to its single terminal outcome.
    ///
    /// `max_runtime` arms the wall-clock limit (`None` = unlimited); `cancel`
    /// is the job's cancellation token. Returns `Err` only when the process
    /// could not be spawned at all.
    pub async fn run(
        &self,
        job_id: JobId,
        cmd: &FetchCommand,
        max_runtime: Option<Duration>,
        cancel: &CancellationToken,
    ) -> Result<ExitOutcome, JobError> {
        self.broadcaster
            .write_line(job_id, format!("$ {}", cmd.redacted_display()))
            .await;

        let mut child = Command::new(cmd.executable())
            .args(cmd.args())
            .current_dir(cmd.target_dir())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| JobError::SpawnFailed {
                detail: e.to_string(),
            })?;

        debug!(job = %job_id, pid = ?child.id(), "downloader spawned");

        let out_task = self.forward(job_id, child.stdout.take());
        let err_task = self.forward(job_id, child.stderr.take());

        let outcome = self.wait(job_id, &mut child, max_runtime, cancel).await;

        // Pipes reach EOF once the process is gone; drain them fully before
        // the caller closes the stream.
        let _ = out_task.await;
        let _ = err_task.await;

        Ok(outcome)
    }

    /// Forwards one output pipe into the job's log stream, line by line.
    ///
    /// Order is preserved per pipe; no ordering is guaranteed across
    /// stdout/stderr.
    fn forward<R>(&self, job_id: JobId, pipe: Option<R>) -> JoinHandle<()>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let broadcaster = self.broadcaster.clone();
        tokio::spawn(async move {
            let Some(pipe) = pipe else { return };
            let mut lines = BufReader::new(pipe).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                broadcaster.write_line(job_id, line).await;
            }
        })
    }

    /// Races process exit against the runtime limit and cancellation.
    async fn wait(
        &self,
        job_id: JobId,
        child: &mut Child,
        max_runtime: Option<Duration>,
        cancel: &CancellationToken,
    ) -> ExitOutcome {
        let limit = async {
            match max_runtime {
                Some(d) => tokio::time::sleep(d).await,
                None => std::future::pending().await,
            }
        };
        tokio::pin!(limit);

        tokio::select! {
            status = child.wait() => {
                let code = match status {
                    Ok(s) => s.code().unwrap_or(-1),
                    Err(e) => {
                        warn!(job = %job_id, error = %e, "wait on child failed");
                        -1
                    }
                };
                ExitOutcome::Code(code)
            }
            _ = &mut limit => {
                // The timeout line goes into the stream before the kill.
                let limit = max_runtime.unwrap_or_default();
                self.broadcaster
                    .write_line(job_id, format!("runtime limit of {limit:?} exceeded, terminating"))
                    .await;
                self.terminate(job_id, child).await;
                ExitOutcome::Terminated(TerminationReason::Timeout { limit })
            }
            _ = cancel.cancelled() => {
                self.broadcaster
                    .write_line(job_id, "cancelled by user")
                    .await;
                self.terminate(job_id, child).await;
                ExitOutcome::Terminated(TerminationReason::Cancelled)
            }
        }
    }

    /// Forcefully terminates and reaps the child.
    async fn terminate(&self, job_id: JobId, child: &mut Child) {
        if let Err(e) = child.kill().await {
            warn!(job = %job_id, error = %e, "failed to kill child process");
        }
    }
}
