/// Change events emitted by the store
///
/// Every event carries a sequence number assigned inside the store's
/// exclusive section, so sinks observe events in strictly increasing order.
use serde::{Deserialize, Serialize};

use super::message::Message;

/// Outcome of a reaction toggle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReactionAction {
    Added,
    Removed,
}

/// Payload of a `reaction_updated` event
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionUpdate {
    pub message_id: String,
    pub emoji: String,
    pub user_id: String,
    pub action: ReactionAction,
    /// Message state after the toggle
    pub message: Message,
}

/// State change produced by a store mutation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    Message(Message),
    ReactionUpdated(ReactionUpdate),
}

impl ChatEvent {
    /// Wire type name
    pub fn kind(&self) -> &'static str {
        match self {
            ChatEvent::Message(_) => "message",
            ChatEvent::ReactionUpdated(_) => "reaction_updated",
        }
    }
}

/// Event stamped with its store sequence number
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequencedEvent {
    pub seq: u64,
    pub event: ChatEvent,
}

/// Receiver of store change events
///
/// Called while the store holds its write lock: implementations must not
/// block and must not call back into the store.
pub trait EventSink: Send + Sync {
    fn publish(&self, event: SequencedEvent);
}
