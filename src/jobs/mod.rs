//! Job model: identity, status state machine, and the per-job record.

mod job;

pub use job::{Job, JobId, JobStatus};
