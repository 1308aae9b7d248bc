//! Per-job log streams: one writer, any number of independent subscribers,
//! with an explicit terminal close signal.

mod broadcaster;
mod stream;

pub mod sse;

pub use broadcaster::LogBroadcaster;
pub use stream::{LogChunk, LogSubscriber};
