//! Collaborator traits (ports) - define the interface to external systems
//!
//! The gateway owns no durable state. Room membership, message persistence,
//! credential verification, and status bookkeeping live behind these traits;
//! the composition root injects concrete implementations as `Arc<dyn _>`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{AuthIdentity, NewMessage, PersistedMessage, PresenceStatus};
use crate::error::DomainError;
use crate::value_objects::{RoomId, UserId};

/// Result type for collaborator operations
pub type DomainResult<T> = Result<T, DomainError>;

// ============================================================================
// Chat Directory
// ============================================================================

/// Authoritative source of room existence and membership
#[async_trait]
pub trait ChatDirectory: Send + Sync {
    /// Check whether a user is currently a member of a room
    ///
    /// Returns `RoomNotFound` when the room does not exist.
    async fn is_member(&self, user_id: UserId, room_id: RoomId) -> DomainResult<bool>;

    /// List the current members of a room
    async fn members_of(&self, room_id: RoomId) -> DomainResult<Vec<UserId>>;

    /// List the rooms a user belongs to (used for auto-subscribe on connect)
    async fn rooms_of(&self, user_id: UserId) -> DomainResult<Vec<RoomId>>;
}

// ============================================================================
// Message Store
// ============================================================================

/// Durable message persistence
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// Persist a new message, returning the stored representation with its
    /// assigned id and denormalized sender display fields
    async fn create_message(&self, message: NewMessage) -> DomainResult<PersistedMessage>;
}

// ============================================================================
// Credential Verifier
// ============================================================================

/// Verifies a bearer credential presented at handshake
#[async_trait]
pub trait CredentialVerifier: Send + Sync {
    /// Resolve a credential to a user identity, or fail
    async fn verify(&self, token: &str) -> DomainResult<AuthIdentity>;
}

// ============================================================================
// Status Store
// ============================================================================

/// Records externally visible status changes in durable storage
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Persist a user's status and last-seen stamp
    async fn set_user_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> DomainResult<()>;
}
