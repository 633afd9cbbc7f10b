//! Room membership
//!
//! Tracks which connections and users are subscribed to which rooms. The
//! chat directory is the authority on who may subscribe; membership is
//! re-validated on every join attempt. A user stays in a room's subscriber
//! set for as long as at least one of their connections is subscribed.

use dashmap::DashMap;
use relay_core::{ChatDirectory, ConnectionId, DomainError, DomainResult, RoomId, UserId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Result of a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// The user is newly in the room's subscriber set
    Subscribed,
    /// The user was already subscribed through another connection; only the
    /// new connection's membership was recorded
    AlreadySubscribed,
}

/// Result of a leave
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// The user's last subscribed connection left; the user is out of the room
    UserLeft,
    /// One connection left but the user remains subscribed through others
    ConnectionLeft,
    /// The connection was not subscribed to the room
    NotSubscribed,
}

/// Tracks room subscriptions per user and per connection
pub struct RoomMembership {
    directory: Arc<dyn ChatDirectory>,

    /// Room id to (user id -> subscribed connection ids)
    rooms: DashMap<RoomId, HashMap<UserId, HashSet<ConnectionId>>>,

    /// Connection id to subscribed room ids, for unwind on disconnect
    by_connection: DashMap<ConnectionId, HashSet<RoomId>>,
}

impl RoomMembership {
    /// Create a new membership tracker backed by the given directory
    #[must_use]
    pub fn new(directory: Arc<dyn ChatDirectory>) -> Self {
        Self {
            directory,
            rooms: DashMap::new(),
            by_connection: DashMap::new(),
        }
    }

    /// Subscribe a connection to a room, validating membership first
    ///
    /// # Errors
    /// `NotRoomMember` when the directory does not report the user as a
    /// member (no mutation is performed), or whatever the directory itself
    /// fails with (e.g. `RoomNotFound`).
    pub async fn join(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> DomainResult<JoinOutcome> {
        if !self.directory.is_member(user_id, room_id).await? {
            return Err(DomainError::NotRoomMember { user_id, room_id });
        }

        Ok(self.subscribe_unchecked(user_id, connection_id, room_id))
    }

    /// Subscribe without consulting the directory
    ///
    /// Used for auto-subscribe on connect, where the room list came from the
    /// directory itself.
    pub fn subscribe_unchecked(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> JoinOutcome {
        let outcome = {
            let mut room = self.rooms.entry(room_id).or_default();
            let newly_subscribed = !room.contains_key(&user_id);
            room.entry(user_id).or_default().insert(connection_id);

            if newly_subscribed {
                JoinOutcome::Subscribed
            } else {
                JoinOutcome::AlreadySubscribed
            }
        };

        self.by_connection
            .entry(connection_id)
            .or_default()
            .insert(room_id);

        tracing::trace!(
            user_id = %user_id,
            connection_id = %connection_id,
            room_id = %room_id,
            outcome = ?outcome,
            "Connection subscribed to room"
        );

        outcome
    }

    /// Unsubscribe a connection from a room
    pub fn leave(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> LeaveOutcome {
        if let Some(mut rooms) = self.by_connection.get_mut(&connection_id) {
            rooms.remove(&room_id);
        }

        let outcome = self.remove_from_room(user_id, connection_id, room_id);

        tracing::trace!(
            user_id = %user_id,
            connection_id = %connection_id,
            room_id = %room_id,
            outcome = ?outcome,
            "Connection left room"
        );

        outcome
    }

    /// Remove a connection from every room it is subscribed to
    ///
    /// Returns the rooms the user fully left (their last subscribed
    /// connection was this one), so the caller can notify the remaining
    /// subscribers.
    pub fn unwind_connection(&self, connection_id: ConnectionId, user_id: UserId) -> Vec<RoomId> {
        let Some((_, room_ids)) = self.by_connection.remove(&connection_id) else {
            return Vec::new();
        };

        room_ids
            .into_iter()
            .filter(|room_id| {
                self.remove_from_room(user_id, connection_id, *room_id) == LeaveOutcome::UserLeft
            })
            .collect()
    }

    /// Get the users currently subscribed to a room
    pub fn subscribers_of(&self, room_id: RoomId) -> Vec<UserId> {
        self.rooms
            .get(&room_id)
            .map(|room| room.keys().copied().collect())
            .unwrap_or_default()
    }

    /// Get every (user, connection) pair subscribed to a room, for fanout
    pub fn connections_in(&self, room_id: RoomId) -> Vec<(UserId, ConnectionId)> {
        self.rooms
            .get(&room_id)
            .map(|room| {
                room.iter()
                    .flat_map(|(user_id, conns)| conns.iter().map(|c| (*user_id, *c)))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Check whether a user is subscribed to a room
    pub fn is_subscribed(&self, user_id: UserId, room_id: RoomId) -> bool {
        self.rooms
            .get(&room_id)
            .is_some_and(|room| room.contains_key(&user_id))
    }

    /// Number of rooms with at least one subscriber
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Removal shared by leave and unwind; cleans up empty user and room
    /// entries under the room's entry lock.
    fn remove_from_room(
        &self,
        user_id: UserId,
        connection_id: ConnectionId,
        room_id: RoomId,
    ) -> LeaveOutcome {
        let dashmap::Entry::Occupied(mut room) = self.rooms.entry(room_id) else {
            return LeaveOutcome::NotSubscribed;
        };

        let outcome = match room.get_mut().get_mut(&user_id) {
            Some(conns) => {
                if !conns.remove(&connection_id) {
                    LeaveOutcome::NotSubscribed
                } else if conns.is_empty() {
                    room.get_mut().remove(&user_id);
                    LeaveOutcome::UserLeft
                } else {
                    LeaveOutcome::ConnectionLeft
                }
            }
            None => LeaveOutcome::NotSubscribed,
        };

        if room.get().is_empty() {
            room.remove();
        }

        outcome
    }
}

impl std::fmt::Debug for RoomMembership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RoomMembership")
            .field("rooms", &self.rooms.len())
            .field("connections", &self.by_connection.len())
            .finish()
    }
}
