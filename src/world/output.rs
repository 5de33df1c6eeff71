//! Per-session output sink.
//!
//! Every player owns one [`OutputSink`]: the sending half of a bounded channel
//! whose receiving half is drained by the session's writer task. Sends never
//! block, so a stalled client can fill its own buffer but cannot stall the
//! thread that is broadcasting to it.

use log::warn;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;

use crate::logutil::escape_log;
use crate::metrics;

/// Outcome of a single `send`. Undeliverable output is reported, never raised.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    /// The session's buffer is full; the line was dropped.
    Dropped,
    /// The session has gone away; the player should be reaped.
    Closed,
}

impl Delivery {
    pub fn is_delivered(self) -> bool {
        matches!(self, Delivery::Delivered)
    }
}

/// Line-oriented, thread-safe sink feeding one session.
#[derive(Debug, Clone)]
pub struct OutputSink {
    tx: mpsc::Sender<String>,
    closed: Arc<AtomicBool>,
}

impl OutputSink {
    /// Create a sink buffering up to `buffer` lines, plus the receiver the
    /// session writer drains.
    pub fn channel(buffer: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        (
            Self {
                tx,
                closed: Arc::new(AtomicBool::new(false)),
            },
            rx,
        )
    }

    /// Queue one message. `owner` is used for log context only.
    pub fn send(&self, owner: &str, message: &str) -> Delivery {
        if self.is_closed() {
            return Delivery::Closed;
        }
        match self.tx.try_send(message.to_string()) {
            Ok(()) => {
                metrics::inc_lines_delivered();
                Delivery::Delivered
            }
            Err(TrySendError::Full(_)) => {
                metrics::inc_lines_dropped();
                warn!(
                    target: "tinyworld::session",
                    "output buffer full for {}; dropped: {}",
                    escape_log(owner),
                    escape_log(message)
                );
                Delivery::Dropped
            }
            Err(TrySendError::Closed(_)) => {
                self.closed.store(true, Ordering::Release);
                metrics::inc_lines_dropped();
                warn!(
                    target: "tinyworld::session",
                    "output sink closed for {}; scheduling removal",
                    escape_log(owner)
                );
                Delivery::Closed
            }
        }
    }

    /// True once a send has observed the receiver gone, or the session closed it.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire) || self.tx.is_closed()
    }

    /// Mark the sink closed from the session side (QUIT, socket error).
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delivers_in_order() {
        let (sink, mut rx) = OutputSink::channel(4);
        assert_eq!(sink.send("alice", "one"), Delivery::Delivered);
        assert_eq!(sink.send("alice", "two"), Delivery::Delivered);
        assert_eq!(rx.try_recv().unwrap(), "one");
        assert_eq!(rx.try_recv().unwrap(), "two");
    }

    #[test]
    fn full_buffer_drops_without_blocking() {
        let (sink, mut rx) = OutputSink::channel(1);
        assert_eq!(sink.send("bob", "kept"), Delivery::Delivered);
        assert_eq!(sink.send("bob", "lost"), Delivery::Dropped);
        assert!(!sink.is_closed());
        assert_eq!(rx.try_recv().unwrap(), "kept");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn dropped_receiver_closes_sink() {
        let (sink, rx) = OutputSink::channel(2);
        drop(rx);
        assert_eq!(sink.send("carol", "hello?"), Delivery::Closed);
        assert!(sink.is_closed());
        assert_eq!(sink.send("carol", "again"), Delivery::Closed);
    }

    #[test]
    fn writer_sees_end_of_stream_after_last_sender() {
        let (sink, mut rx) = OutputSink::channel(2);
        let clone = sink.clone();
        sink.send("dave", "bye");
        drop(sink);
        drop(clone);
        assert_eq!(tokio_test::block_on(rx.recv()).as_deref(), Some("bye"));
        assert_eq!(tokio_test::block_on(rx.recv()), None);
    }
}
