//! Domain errors - error types returned by collaborators

use thiserror::Error;

use crate::value_objects::{MessageId, RoomId, UserId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("User not found: {0}")]
    UserNotFound(UserId),

    #[error("Room not found: {0}")]
    RoomNotFound(RoomId),

    #[error("Message not found: {0}")]
    MessageNotFound(MessageId),

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("User {user_id} is not a member of room {room_id}")]
    NotRoomMember { user_id: UserId, room_id: RoomId },

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// Bad, expired, or otherwise unverifiable credential
    #[error("Credential rejected")]
    CredentialRejected,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    Validation(String),

    // =========================================================================
    // Infrastructure Errors
    // =========================================================================
    /// Transient downstream failure (create/update could not be completed)
    #[error("Storage error: {0}")]
    Storage(String),
}

impl DomainError {
    /// True for errors the caller may reasonably retry
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Storage(_))
    }
}
