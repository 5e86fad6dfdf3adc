/// WebSocket message schema
///
/// Both directions use the same envelope:
/// `{ "type": <string>, "data": <type-specific payload> }`
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;

use crate::chat::{ChatEvent, Message, ReactionUpdate};

// ============================================================================
// CLIENT MESSAGES (Client → Server)
// ============================================================================

/// Raw inbound envelope, before the payload is interpreted
#[derive(Debug, Clone, Deserialize)]
pub struct InboundEnvelope {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// `send_message` payload
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SendMessageRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub author_name: String,
}

/// `add_reaction` payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AddReactionRequest {
    pub message_id: String,
    pub emoji: String,
}

/// Decoded client request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientMessage {
    SendMessage(SendMessageRequest),
    AddReaction(AddReactionRequest),
}

/// Inbound decoding failures; none of them close the connection
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("invalid envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),

    #[error("invalid {kind} payload: {source}")]
    InvalidPayload {
        kind: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("empty emoji in add_reaction")]
    EmptyEmoji,

    #[error("unknown message type: {0}")]
    UnknownType(String),
}

impl ClientMessage {
    /// Decode one text frame
    pub fn decode(text: &str) -> Result<Self, ProtocolError> {
        let envelope: InboundEnvelope =
            serde_json::from_str(text).map_err(ProtocolError::InvalidEnvelope)?;

        let payload_error = |source| ProtocolError::InvalidPayload {
            kind: envelope.kind.clone(),
            source,
        };

        match envelope.kind.as_str() {
            "send_message" => serde_json::from_value(envelope.data.clone())
                .map(ClientMessage::SendMessage)
                .map_err(payload_error),
            "add_reaction" => {
                let req: AddReactionRequest =
                    serde_json::from_value(envelope.data.clone()).map_err(payload_error)?;
                if req.emoji.is_empty() {
                    return Err(ProtocolError::EmptyEmoji);
                }
                Ok(ClientMessage::AddReaction(req))
            }
            other => Err(ProtocolError::UnknownType(other.to_string())),
        }
    }
}

// ============================================================================
// SERVER MESSAGES (Server → Client)
// ============================================================================

/// Outbound event, borrowed from the state it describes
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ServerEvent<'a> {
    Message(&'a Message),
    ReactionUpdated(&'a ReactionUpdate),
    Error { error: &'a str },
}

impl<'a> ServerEvent<'a> {
    /// Serialize to JSON text
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl<'a> From<&'a ChatEvent> for ServerEvent<'a> {
    fn from(event: &'a ChatEvent) -> Self {
        match event {
            ChatEvent::Message(msg) => ServerEvent::Message(msg),
            ChatEvent::ReactionUpdated(update) => ServerEvent::ReactionUpdated(update),
        }
    }
}

/// Encoded frame queued for a connection's writer
///
/// `seq` is the store sequence number of the event, or 0 for frames that
/// are not store events (direct replies, snapshot entries).
#[derive(Debug, Clone)]
pub struct OutboundFrame {
    pub seq: u64,
    pub text: Arc<str>,
}

impl OutboundFrame {
    pub fn unsequenced(text: impl Into<Arc<str>>) -> Self {
        Self {
            seq: 0,
            text: text.into(),
        }
    }
}
