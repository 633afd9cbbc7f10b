//! Router error types
//!
//! Everything a handler can fail with is caught at the dispatch boundary
//! and turned into an `error` event for the originating connection only.

use crate::protocol::{ErrorPayload, ServerEvent};
use relay_core::DomainError;
use thiserror::Error;

/// Errors raised while handling an inbound event
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Authenticated, but not a member of the addressed room
    #[error("You are not a member of this chat")]
    NotRoomMember,

    /// Referenced room/message/user is absent
    #[error("{0}")]
    NotFound(String),

    /// Malformed or out-of-bounds payload
    #[error("Validation error: {0}")]
    Validation(String),

    /// Downstream create/update failed; the event is reported to the sender
    /// and not retried
    #[error("Failed to persist: {0}")]
    Persistence(String),

    /// Anything that should not happen
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Stable machine-readable code for the wire
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::NotRoomMember => "not_room_member",
            Self::NotFound(_) => "not_found",
            Self::Validation(_) => "validation_error",
            Self::Persistence(_) => "persistence_error",
            Self::Internal(_) => "internal_error",
        }
    }

    /// Convert into the `error` event sent to the originating connection
    #[must_use]
    pub fn to_event(&self) -> ServerEvent {
        ServerEvent::Error(ErrorPayload {
            code: self.code().to_string(),
            message: self.to_string(),
        })
    }
}

impl From<DomainError> for GatewayError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::NotRoomMember { .. } => Self::NotRoomMember,
            DomainError::RoomNotFound(_)
            | DomainError::UserNotFound(_)
            | DomainError::MessageNotFound(_) => Self::NotFound(err.to_string()),
            DomainError::Validation(msg) => Self::Validation(msg),
            DomainError::Storage(msg) => Self::Persistence(msg),
            // Credentials are checked at handshake; seeing this later is a bug
            DomainError::CredentialRejected => Self::Internal(err.to_string()),
        }
    }
}
