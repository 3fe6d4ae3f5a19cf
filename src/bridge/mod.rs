//! Messaging bridge between the simulation context and the host page
//!
//! The simulation side only sends, the host side only receives. Messages are
//! delivered in emission order, never dropped and never acknowledged, which
//! maps onto an unbounded FIFO channel.
//!
//! # Wire format
//!
//! ```text
//! {"type":"spike","index":3,"time":0.0125}
//! {"type":"progress","elapsed":0.5,"completed":0.25,"start":0.0,"duration":1.0}
//! ```

pub mod functions;
pub mod progress;

use crossbeam::channel::{self, Receiver, Sender, TryIter};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Value returned by [`BridgeSender::send_spike`] so it can sit inside an
/// expression in generated code
pub const SPIKE_DUMMY_RETURN: f64 = 0.0;

/// A message crossing the host/worker boundary
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum MessageEvent {
    /// A discrete event emitted by user-injected code
    Spike { index: i64, time: f64 },
    /// Periodic run progress; `completed` is a fraction in `[0, 1]`
    Progress {
        elapsed: f64,
        completed: f64,
        start: f64,
        duration: f64,
    },
}

impl MessageEvent {
    pub fn spike(
        index: i64,
        time: f64,
    ) -> Self {
        MessageEvent::Spike { index, time }
    }

    pub fn progress(
        elapsed: f64,
        completed: f64,
        start: f64,
        duration: f64,
    ) -> Self {
        MessageEvent::Progress {
            elapsed,
            completed: completed.clamp(0.0, 1.0),
            start,
            duration,
        }
    }

    /// `true` for the report marking the start of a run
    pub fn is_run_start(&self) -> bool {
        matches!(self, MessageEvent::Progress { completed, .. } if *completed == 0.0)
    }

    /// `true` for the report marking completion of a run
    pub fn is_run_complete(&self) -> bool {
        matches!(self, MessageEvent::Progress { completed, .. } if *completed == 1.0)
    }

    /// Encode in the wire format
    pub fn to_json(&self) -> String {
        // Serializing a plain enum of numbers cannot fail
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Decode from the wire format
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Create a connected sender/receiver pair
pub fn bridge() -> (BridgeSender, BridgeReceiver) {
    let (tx, rx) = channel::unbounded();
    (BridgeSender { tx }, BridgeReceiver { rx })
}

/// Simulation side of the bridge
#[derive(Debug, Clone)]
pub struct BridgeSender {
    tx: Sender<MessageEvent>,
}

impl BridgeSender {
    /// Post a message. Fire-and-forget: a vanished host is not an error for
    /// the simulation.
    pub fn post(
        &self,
        event: MessageEvent,
    ) {
        trace!("bridge <- {:?}", event);
        let _ = self.tx.send(event);
    }

    /// Post a spike and return the dummy value
    pub fn send_spike(
        &self,
        index: i64,
        time: f64,
    ) -> f64 {
        self.post(MessageEvent::spike(index, time));
        SPIKE_DUMMY_RETURN
    }

    /// Post a progress report
    pub fn report_progress(
        &self,
        elapsed: f64,
        completed: f64,
        start: f64,
        duration: f64,
    ) {
        self.post(MessageEvent::progress(elapsed, completed, start, duration));
    }
}

/// Host side of the bridge
#[derive(Debug)]
pub struct BridgeReceiver {
    rx: Receiver<MessageEvent>,
}

impl BridgeReceiver {
    /// Block until the next message; `None` once every sender is gone and
    /// the queue is drained
    pub fn recv(&self) -> Option<MessageEvent> {
        self.rx.recv().ok()
    }

    /// Messages available right now, without blocking
    pub fn try_iter(&self) -> TryIter<'_, MessageEvent> {
        self.rx.try_iter()
    }

    /// Number of undelivered messages
    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}

impl IntoIterator for BridgeReceiver {
    type Item = MessageEvent;
    type IntoIter = channel::IntoIter<MessageEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.rx.into_iter()
    }
}
