//! # One job's log channel and its subscriber handle.
//!
//! A channel is a thin pairing of a [`tokio::sync::broadcast`] sender for
//! data fan-out and a [`tokio::sync::watch`] flag for the terminal close
//! signal. Broadcast alone cannot model "already finished": a receiver
//! created after the last send would block forever, so closure is carried on
//! the watch side, which every subscriber (however late) can observe.
//!
//! ## Rules
//! - The channel transitions **once** from open to closed; close is idempotent.
//! - Writes after close are dropped.
//! - A subscriber drains data already in its buffer before reporting closure,
//!   so within one job all log output precedes the completion signal.

use tokio::sync::{broadcast, watch};

/// One item yielded by a [`LogSubscriber`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogChunk {
    /// One log line, in per-stream arrival order.
    Data(String),
    /// The stream is closed; no further data will arrive.
    Closed,
}

/// Sender side of one job's log stream.
pub(crate) struct LogChannel {
    data: broadcast::Sender<String>,
    closed: watch::Sender<bool>,
}

impl LogChannel {
    pub(crate) fn new(capacity: usize) -> Self {
        let (data, _rx) = broadcast::channel(capacity.max(1));
        let (closed, _rx) = watch::channel(false);
        Self { data, closed }
    }

    /// Appends one line and fans it out to current subscribers.
    ///
    /// Dropped silently when nobody is subscribed or the channel is closed.
    pub(crate) fn write(&self, line: String) {
        if *self.closed.borrow() {
            return;
        }
        let _ = self.data.send(line);
    }

    /// Marks the channel terminal. Idempotent.
    pub(crate) fn close(&self) {
        self.closed.send_replace(true);
    }

    pub(crate) fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Creates an independent live feed over this channel.
    pub(crate) fn subscribe(&self) -> LogSubscriber {
        LogSubscriber {
            rx: self.data.subscribe(),
            closed: self.closed.subscribe(),
        }
    }
}

/// Independent reader over one job's log stream.
///
/// Yields [`LogChunk::Data`] until the stream closes, then [`LogChunk::Closed`].
/// A subscriber created after closure yields `Closed` immediately. Dropping a
/// subscriber affects neither other subscribers nor the write path.
pub struct LogSubscriber {
    rx: broadcast::Receiver<String>,
    closed: watch::Receiver<bool>,
}

impl LogSubscriber {
    /// Waits for the next chunk.
    ///
    /// After the first `Closed` every further call returns `Closed` without
    /// blocking.
    pub async fn recv(&mut self) -> LogChunk {
        loop {
            if *self.closed.borrow() {
                // Closed: drain whatever was buffered before reporting it.
                return match self.rx.try_recv() {
                    Ok(line) => LogChunk::Data(line),
                    Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                    Err(_) => LogChunk::Closed,
                };
            }
            tokio::select! {
                res = self.rx.recv() => match res {
                    Ok(line) => return LogChunk::Data(line),
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => return LogChunk::Closed,
                },
                changed = self.closed.changed() => {
                    if changed.is_err() {
                        return LogChunk::Closed;
                    }
                    // Loop re-checks the flag and drains buffered lines.
                }
            }
        }
    }
}
