//! Individual WebSocket connection
//!
//! A connection is authenticated before it exists: the identity is resolved
//! at handshake and immutable for the connection's lifetime.

use crate::protocol::ServerEvent;
use relay_core::{AuthIdentity, ConnectionId, UserId};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::mpsc;

/// A single live connection
pub struct Connection {
    /// Unique connection id, minted at handshake
    id: ConnectionId,

    /// Identity resolved by the auth gate
    identity: AuthIdentity,

    /// Channel to the task writing this connection's WebSocket
    sender: mpsc::Sender<ServerEvent>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(
        id: ConnectionId,
        identity: AuthIdentity,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Arc<Self> {
        Arc::new(Self {
            id,
            identity,
            sender,
            created_at: Instant::now(),
        })
    }

    /// Get the connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Get the owning user's id
    pub fn user_id(&self) -> UserId {
        self.identity.user_id
    }

    /// Get the resolved identity
    pub fn identity(&self) -> &AuthIdentity {
        &self.identity
    }

    /// Get the user's display name
    pub fn display_name(&self) -> &str {
        &self.identity.display_name
    }

    /// Queue an event for delivery to this connection
    ///
    /// Never blocks: a full or closed outbound buffer fails this send only,
    /// so one slow consumer cannot stall fanout to the rest of a room.
    pub fn send(
        &self,
        event: ServerEvent,
    ) -> Result<(), mpsc::error::TrySendError<ServerEvent>> {
        self.sender.try_send(event)
    }

    /// Check if the outbound channel is closed
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }

    /// Get connection age
    pub fn age(&self) -> std::time::Duration {
        self.created_at.elapsed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("user_id", &self.identity.user_id)
            .field("created_at", &self.created_at)
            .finish()
    }
}
