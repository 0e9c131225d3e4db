//! Notifications emitted by the registry for external observers.
//!
//! Delivery is best effort: a sink that drops events never affects the
//! outcome of the operation that produced them.

use crate::types::{BallotIndex, OptionIndex, VoterId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::debug;

/// Registry notifications
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum BallotEvent {
    /// A new ballot was appended to the registry
    #[serde(rename = "BALLOT_CREATED")]
    BallotCreated { index: BallotIndex },

    /// A vote was recorded
    #[serde(rename = "VOTE_CAST")]
    VoteCast {
        index: BallotIndex,
        voter: VoterId,
        option: OptionIndex,
    },
}

impl BallotEvent {
    /// Serialize event to JSON bytes
    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize event from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// Receiver of registry notifications
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &BallotEvent);
}

/// Writes every event to the log
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl EventSink for TracingSink {
    fn emit(&self, event: &BallotEvent) {
        match event {
            BallotEvent::BallotCreated { index } => {
                debug!("Event: BallotCreated(index={})", index);
            }
            BallotEvent::VoteCast {
                index,
                voter,
                option,
            } => {
                debug!(
                    "Event: VoteCast(index={}, voter={}, option={})",
                    index, voter, option
                );
            }
        }
    }
}

/// Forwards events into a tokio channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<BallotEvent>,
}

impl ChannelSink {
    pub fn new(tx: mpsc::UnboundedSender<BallotEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink together with the receiving end
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<BallotEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: &BallotEvent) {
        // Receiver gone: nobody is listening any more
        let _ = self.tx.send(event.clone());
    }
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<BallotEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of all events recorded so far
    pub fn events(&self) -> Vec<BallotEvent> {
        self.events.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.events.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.lock().is_empty()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: &BallotEvent) {
        self.events.lock().push(event.clone());
    }
}

impl<T: EventSink + ?Sized> EventSink for std::sync::Arc<T> {
    fn emit(&self, event: &BallotEvent) {
        (**self).emit(event)
    }
}
