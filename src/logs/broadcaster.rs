//! # Log broadcaster: the per-job stream table.
//!
//! Owns one [`LogChannel`](super::stream::LogChannel) per job, keyed by
//! [`JobId`]. The process supervisor is the only writer; any number of
//! observers subscribe independently. Streams are retained after closure for
//! the life of the process so that clients polling a finished job still get
//! a well-formed completion signal instead of a dangling connection.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::stream::{LogChannel, LogSubscriber};
use crate::jobs::JobId;

/// Table of per-job log streams.
pub struct LogBroadcaster {
    capacity: usize,
    streams: RwLock<HashMap<JobId, LogChannel>>,
}

impl LogBroadcaster {
    /// Creates an empty broadcaster; `capacity` is the per-stream ring buffer
    /// size shared by all of that stream's subscribers.
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            streams: RwLock::new(HashMap::new()),
        }
    }

    /// Opens the stream for a job. No-op if the job already has one; a job
    /// never has more than one live stream.
    pub async fn publish(&self, job_id: JobId) {
        let mut streams = self.streams.write().await;
        streams
            .entry(job_id)
            .or_insert_with(|| LogChannel::new(self.capacity));
    }

    /// Appends one line to a job's stream and fans it out.
    ///
    /// Unknown job ids and closed streams drop the line silently; the write
    /// path never fails into the supervisor.
    pub async fn write_line(&self, job_id: JobId, line: impl Into<String>) {
        let streams = self.streams.read().await;
        if let Some(ch) = streams.get(&job_id) {
            ch.write(line.into());
        }
    }

    /// Marks a job's stream terminal. Idempotent; unknown ids are ignored.
    pub async fn close(&self, job_id: JobId) {
        let streams = self.streams.read().await;
        if let Some(ch) = streams.get(&job_id) {
            ch.close();
        }
    }

    /// True once [`close`](Self::close) has run for the job.
    pub async fn is_closed(&self, job_id: JobId) -> bool {
        let streams = self.streams.read().await;
        streams.get(&job_id).is_some_and(LogChannel::is_closed)
    }

    /// Subscribes to a job's stream; `None` when the job id is unknown.
    ///
    /// Subscribing to an already closed stream succeeds and yields the
    /// completion signal immediately.
    pub async fn subscribe(&self, job_id: JobId) -> Option<LogSubscriber> {
        let streams = self.streams.read().await;
        streams.get(&job_id).map(LogChannel::subscribe)
    }
}
