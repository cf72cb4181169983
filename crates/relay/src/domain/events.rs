use relay_core::BookDelta;
use serde::Serialize;
use tokio::sync::mpsc;

/// Events a feed connector reports for its session
#[derive(Debug, Clone)]
pub enum FeedEvent {
    /// Order book change for the subscribed pair
    Delta(BookDelta),
    /// The upstream connection failed after the session started
    Fault(String),
}

/// A feed event tagged with the epoch of the session that produced it
#[derive(Debug, Clone)]
pub struct SessionEvent {
    pub epoch: u64,
    pub event: FeedEvent,
}

/// Callback end handed to a connector when a session opens.
///
/// Events are tagged with the session epoch so the relay can discard
/// callbacks from sessions that have already been shut down.
#[derive(Debug, Clone)]
pub struct DeltaSink {
    epoch: u64,
    tx: mpsc::UnboundedSender<SessionEvent>,
}

impl DeltaSink {
    pub fn new(epoch: u64, tx: mpsc::UnboundedSender<SessionEvent>) -> Self {
        DeltaSink { epoch, tx }
    }

    /// Report a delta. Returns false once the relay has gone away.
    pub fn deliver(&self, delta: BookDelta) -> bool {
        self.send(FeedEvent::Delta(delta))
    }

    /// Report an upstream failure. Returns false once the relay has gone away.
    pub fn fault(&self, reason: impl Into<String>) -> bool {
        self.send(FeedEvent::Fault(reason.into()))
    }

    /// True once the relay has dropped its end of the event channel
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    fn send(&self, event: FeedEvent) -> bool {
        self.tx
            .send(SessionEvent {
                epoch: self.epoch,
                event,
            })
            .is_ok()
    }
}

/// Message broadcast to every subscriber on a flush: `{"type": "book", "data": {...}}`
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum OutboundMessage<'a> {
    Book(&'a BookDelta),
}
