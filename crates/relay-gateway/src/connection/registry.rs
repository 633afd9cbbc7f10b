//! Connection registry
//!
//! Bidirectional mapping between live connections and user identities,
//! supporting multiple simultaneous connections per user. All mutations on
//! one user's connection set go through that user's DashMap entry, so they
//! are atomic relative to each other.

use super::Connection;
use crate::protocol::ServerEvent;
use dashmap::DashMap;
use relay_core::{ConnectionId, UserId};
use std::collections::HashSet;
use std::sync::Arc;

/// Tracks all live connections
pub struct ConnectionRegistry {
    /// Active connections by connection id
    connections: DashMap<ConnectionId, Arc<Connection>>,

    /// User id to connection ids mapping
    user_connections: DashMap<UserId, HashSet<ConnectionId>>,
}

impl ConnectionRegistry {
    /// Create a new registry
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            user_connections: DashMap::new(),
        }
    }

    /// Create a new registry wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a connection
    ///
    /// Idempotent per connection id: re-registering an id already present is
    /// a no-op.
    pub fn register(&self, connection: Arc<Connection>) {
        let id = connection.id();
        let user_id = connection.user_id();

        if self.connections.contains_key(&id) {
            tracing::debug!(connection_id = %id, "Connection already registered");
            return;
        }

        self.connections.insert(id, connection);
        self.user_connections.entry(user_id).or_default().insert(id);

        tracing::debug!(connection_id = %id, user_id = %user_id, "Connection registered");
    }

    /// Remove a connection in both directions
    ///
    /// Returns the owning user and how many of their connections remain,
    /// counted inside the per-user entry lock so the caller gets an atomic
    /// snapshot for presence recomputation.
    pub fn unregister(&self, id: ConnectionId) -> Option<(UserId, usize)> {
        let (_, connection) = self.connections.remove(&id)?;
        let user_id = connection.user_id();

        let mut remaining = 0;
        if let dashmap::Entry::Occupied(mut entry) = self.user_connections.entry(user_id) {
            entry.get_mut().remove(&id);
            remaining = entry.get().len();
            if remaining == 0 {
                entry.remove();
            }
        }

        tracing::debug!(
            connection_id = %id,
            user_id = %user_id,
            remaining = remaining,
            "Connection unregistered"
        );

        Some((user_id, remaining))
    }

    /// Get a connection by id
    pub fn get(&self, id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&id).map(|r| r.clone())
    }

    /// Get the owner of a connection
    pub fn owner_of(&self, id: ConnectionId) -> Option<UserId> {
        self.connections.get(&id).map(|r| r.user_id())
    }

    /// Get all connections for a user
    pub fn connections_of(&self, user_id: UserId) -> Vec<Arc<Connection>> {
        self.user_connections
            .get(&user_id)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| self.connections.get(id).map(|c| c.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check whether a user has at least one live connection
    pub fn is_user_connected(&self, user_id: UserId) -> bool {
        self.user_connections.contains_key(&user_id)
    }

    /// Send an event to all connections of a user
    ///
    /// Fire-and-forget per connection: a failed send is skipped, never
    /// propagated.
    pub fn send_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        let mut sent = 0;
        for conn in self.connections_of(user_id) {
            if conn.send(event.clone()).is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(user_id = %user_id, sent = sent, "Event sent to user connections");
        sent
    }

    /// Broadcast an event to every live connection
    pub fn broadcast(&self, event: &ServerEvent) -> usize {
        let mut sent = 0;
        for entry in &self.connections {
            if entry.send(event.clone()).is_ok() {
                sent += 1;
            }
        }

        tracing::trace!(event = event.name(), sent = sent, "Event broadcast to all connections");
        sent
    }

    /// Get the total number of live connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of distinct connected users
    pub fn user_count(&self) -> usize {
        self.user_connections.len()
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionRegistry")
            .field("connections", &self.connections.len())
            .field("users", &self.user_connections.len())
            .finish()
    }
}
