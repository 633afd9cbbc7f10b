//! Outbound (server -> client) events

use chrono::{DateTime, Utc};
use relay_core::{MessageId, MessageKind, PersistedMessage, PresenceStatus, RoomId, UserId};
use serde::{Deserialize, Serialize};

/// Outbound events, one variant per event name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum ServerEvent {
    /// A message was persisted and is being fanned out to its room
    MessageReceived(MessagePayload),
    /// A message was edited
    MessageUpdated(MessagePayload),
    /// A message was deleted
    MessageDeleted {
        room_id: RoomId,
        message_id: MessageId,
    },
    /// A user started typing in a room
    UserTyping {
        room_id: RoomId,
        user_id: UserId,
        user_name: String,
    },
    /// A user stopped typing (explicit stop, expiry, leave, or disconnect)
    UserStoppedTyping { room_id: RoomId, user_id: UserId },
    /// A user's visible status changed
    UserStatusChanged {
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    },
    /// A user subscribed to a room for the first time
    UserJoinedChat { room_id: RoomId, user_id: UserId },
    /// A user's last connection left a room
    UserLeftChat { room_id: RoomId, user_id: UserId },
    /// An operation failed; sent only to the originating connection
    Error(ErrorPayload),
}

impl ServerEvent {
    /// Event name as it appears on the wire (for logging)
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MessageReceived(_) => "message_received",
            Self::MessageUpdated(_) => "message_updated",
            Self::MessageDeleted { .. } => "message_deleted",
            Self::UserTyping { .. } => "user_typing",
            Self::UserStoppedTyping { .. } => "user_stopped_typing",
            Self::UserStatusChanged { .. } => "user_status_changed",
            Self::UserJoinedChat { .. } => "user_joined_chat",
            Self::UserLeftChat { .. } => "user_left_chat",
            Self::Error(_) => "error",
        }
    }

    /// Serialize to the JSON text frame sent over the socket
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

/// Full message representation as broadcast to a room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessagePayload {
    pub id: MessageId,
    pub room_id: RoomId,
    pub sender_id: UserId,
    pub sender_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sender_avatar: Option<String>,
    pub content: String,
    #[serde(rename = "type")]
    pub kind: MessageKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<MessageId>,
    pub edited: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PersistedMessage> for MessagePayload {
    fn from(message: PersistedMessage) -> Self {
        Self {
            id: message.id,
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_name: message.sender_name,
            sender_avatar: message.sender_avatar,
            content: message.content,
            kind: message.kind,
            media_url: message.media_url,
            reply_to: message.reply_to,
            edited: message.edited,
            created_at: message.created_at,
            updated_at: message.updated_at,
        }
    }
}

/// Error payload sent to the originating connection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorPayload {
    pub code: String,
    pub message: String,
}
