//! Typing coordinator
//!
//! Ephemeral, self-expiring per-room set of currently-typing users. A user
//! has at most one entry per room; re-signaling typing refreshes the expiry
//! instead of duplicating the entry. Explicit stop, expiry, leaving the
//! room, and disconnect all converge on the same removal path, and removal
//! is idempotent so each disappearance broadcasts at most once.
//!
//! Expiries use `tokio::time::Instant` so tests can pause and advance the
//! clock.

use dashmap::DashMap;
use relay_core::{RoomId, UserId};
use std::collections::HashMap;
use std::time::Duration;
use tokio::time::Instant;

/// Default time a typing entry stays alive without a refresh
pub const DEFAULT_TYPING_TTL: Duration = Duration::from_secs(5);

/// Tracks who is typing in which room
pub struct TypingCoordinator {
    ttl: Duration,

    /// Room id to (user id -> expiry instant)
    rooms: DashMap<RoomId, HashMap<UserId, Instant>>,
}

impl TypingCoordinator {
    /// Create a coordinator with the given entry time-to-live
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            rooms: DashMap::new(),
        }
    }

    /// Insert or refresh a typing entry
    pub fn start(&self, user_id: UserId, room_id: RoomId) {
        let expires_at = Instant::now() + self.ttl;
        self.rooms.entry(room_id).or_default().insert(user_id, expires_at);

        tracing::trace!(user_id = %user_id, room_id = %room_id, "Typing entry refreshed");
    }

    /// Remove a typing entry
    ///
    /// Returns true only when an entry was actually present; removing an
    /// already-absent entry is a no-op and must not drive a re-broadcast.
    pub fn stop(&self, user_id: UserId, room_id: RoomId) -> bool {
        let dashmap::Entry::Occupied(mut room) = self.rooms.entry(room_id) else {
            return false;
        };

        let removed = room.get_mut().remove(&user_id).is_some();
        if room.get().is_empty() {
            room.remove();
        }

        if removed {
            tracing::trace!(user_id = %user_id, room_id = %room_id, "Typing entry removed");
        }
        removed
    }

    /// Get the users currently typing in a room, ignoring expired entries
    /// that have not been swept yet
    pub fn active_typists(&self, room_id: RoomId) -> Vec<UserId> {
        let now = Instant::now();
        self.rooms
            .get(&room_id)
            .map(|room| {
                room.iter()
                    .filter(|(_, expires_at)| **expires_at > now)
                    .map(|(user_id, _)| *user_id)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Remove a user's entries in every room (disconnect path)
    ///
    /// Returns the rooms where an entry was removed.
    pub fn unwind_user(&self, user_id: UserId) -> Vec<RoomId> {
        let mut removed = Vec::new();
        self.rooms.retain(|room_id, room| {
            if room.remove(&user_id).is_some() {
                removed.push(*room_id);
            }
            !room.is_empty()
        });
        removed
    }

    /// Remove and return every expired entry (sweep path)
    pub fn collect_expired(&self) -> Vec<(RoomId, UserId)> {
        let now = Instant::now();
        let mut expired = Vec::new();

        self.rooms.retain(|room_id, room| {
            room.retain(|user_id, expires_at| {
                if *expires_at <= now {
                    expired.push((*room_id, *user_id));
                    false
                } else {
                    true
                }
            });
            !room.is_empty()
        });

        expired
    }
}

impl std::fmt::Debug for TypingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingCoordinator")
            .field("ttl", &self.ttl)
            .field("rooms", &self.rooms.len())
            .finish()
    }
}
