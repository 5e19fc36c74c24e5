//! Engine events for whoever displays the graph.
//!
//! The engine never blocks on a slow consumer: events go through a bounded
//! crossbeam channel with `try_send`, and events that do not fit are
//! dropped and counted.

use crate::graph::{NodeId, NodeKind};
use crate::operators::RunReport;
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Channel capacity for engine events.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Something the engine did.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// A run started; the node is now `Running`.
    NodeStarted { node_id: NodeId, kind: NodeKind },

    /// A run finished, possibly with a warning.
    NodeFinished(RunReport),

    /// A run aborted.
    NodeFailed {
        node_id: NodeId,
        kind: NodeKind,
        message: String,
    },

    /// A Sink replaced the viewer snapshot.
    ViewerUpdated {
        version: u64,
        published_by: NodeId,
        items: usize,
    },
}

/// Sending and receiving ends of the event channel. Clones share the
/// channel and the drop counter.
#[derive(Debug, Clone)]
pub struct EventBridge {
    tx: Sender<FlowEvent>,
    rx: Receiver<FlowEvent>,
    dropped: Arc<AtomicU64>,
}

impl Default for EventBridge {
    fn default() -> Self {
        Self::new(EVENT_CHANNEL_CAPACITY)
    }
}

impl EventBridge {
    pub fn new(capacity: usize) -> Self {
        let (tx, rx) = bounded(capacity.max(1));
        Self {
            tx,
            rx,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Queue an event without blocking. A full queue drops it.
    pub fn emit(&self, event: FlowEvent) {
        if self.tx.try_send(event).is_err() {
            let dropped = self.dropped.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::debug!("Event queue full, {} events dropped so far", dropped);
        }
    }

    /// Drain all pending events.
    pub fn drain(&self) -> Vec<FlowEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn try_recv(&self) -> Option<FlowEvent> {
        self.rx.try_recv().ok()
    }

    /// Events lost to a full queue.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}
