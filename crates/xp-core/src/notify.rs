//! Progress notification plumbing.
//!
//! Deletion loops report progress as one-way events. Emission is
//! fire-and-forget: a missing or dropped subscriber is never observable as
//! an error to the emitting loop.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// Progress events emitted by deletion loops.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ProgressNotice {
    /// The running count changed.
    UpdateCounter { count: u64 },
    /// The session terminated; `count` is the session total.
    Finished { count: u64 },
}

/// Optional subscriber seam for progress events.
pub trait ProgressSink: Send + Sync {
    fn emit(&self, notice: ProgressNotice);
}

/// Sink with no subscriber.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _notice: ProgressNotice) {}
}

/// Sink forwarding into an unbounded channel. Send failures (receiver gone)
/// are swallowed.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressNotice>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn emit(&self, notice: ProgressNotice) {
        let _ = self.tx.send(notice);
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for Arc<S> {
    fn emit(&self, notice: ProgressNotice) {
        (**self).emit(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn notices_serialize_with_type_tag() {
        let update = serde_json::to_value(ProgressNotice::UpdateCounter { count: 3 }).unwrap();
        assert_eq!(
            update,
            serde_json::json!({ "type": "updateCounter", "count": 3 })
        );
        let finished = serde_json::to_value(ProgressNotice::Finished { count: 7 }).unwrap();
        assert_eq!(
            finished,
            serde_json::json!({ "type": "finished", "count": 7 })
        );
    }

    #[tokio::test]
    async fn channel_sink_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        sink.emit(ProgressNotice::UpdateCounter { count: 1 });
        sink.emit(ProgressNotice::Finished { count: 1 });
        assert_eq!(rx.recv().await, Some(ProgressNotice::UpdateCounter { count: 1 }));
        assert_eq!(rx.recv().await, Some(ProgressNotice::Finished { count: 1 }));
    }

    #[tokio::test]
    async fn dropped_receiver_is_not_an_error() {
        let (sink, rx) = ChannelSink::new();
        drop(rx);
        // Must not panic or surface anything to the caller.
        sink.emit(ProgressNotice::UpdateCounter { count: 1 });
    }
}
