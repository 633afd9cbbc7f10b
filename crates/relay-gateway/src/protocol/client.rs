//! Inbound (client -> server) events

use relay_core::{MessageId, MessageKind, PresenceStatus, RoomId};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Inbound events, one variant per event name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    /// Subscribe this connection to a room
    JoinChat(RoomTarget),
    /// Unsubscribe this connection from a room
    LeaveChat(RoomTarget),
    /// Persist a message and fan it out to the room
    SendMessage(SendMessagePayload),
    /// Signal that the user started typing in a room
    TypingStart(RoomTarget),
    /// Signal that the user stopped typing in a room
    TypingStop(RoomTarget),
    /// Explicitly change the user's visible status
    UserStatusChange(StatusChangePayload),
}

impl ClientEvent {
    /// Event name as it appears on the wire (for logging)
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::JoinChat(_) => "join_chat",
            Self::LeaveChat(_) => "leave_chat",
            Self::SendMessage(_) => "send_message",
            Self::TypingStart(_) => "typing_start",
            Self::TypingStop(_) => "typing_stop",
            Self::UserStatusChange(_) => "user_status_change",
        }
    }
}

/// Payload for events that only address a room
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomTarget {
    pub room_id: RoomId,
}

/// Payload for `send_message`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate)]
pub struct SendMessagePayload {
    pub room_id: RoomId,

    #[validate(length(min = 1, max = 4000, message = "Content must be 1-4000 characters"))]
    pub content: String,

    #[serde(default, rename = "type")]
    pub kind: MessageKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
}

/// Payload for `user_status_change`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusChangePayload {
    pub status: PresenceStatus,
}
