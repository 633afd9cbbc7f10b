//! Presence tracker
//!
//! Derives a user's visible status from connection-count transitions plus
//! explicit user requests. The default rule is: online iff the user has at
//! least one live connection. An explicit `away`/`offline` set while
//! connected overrides the default until the next disconnect or reconnect
//! recomputes it; explicit state does not survive a full
//! disconnect/reconnect cycle.
//!
//! This is a pure state machine: every operation returns the visible change
//! (if any) and the caller owns broadcasting and persistence.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use relay_core::{PresenceStatus, UserId, UserPresence};

/// An externally visible presence transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresenceChange {
    pub user_id: UserId,
    pub status: PresenceStatus,
    pub last_seen: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct PresenceState {
    status: PresenceStatus,
    last_seen: DateTime<Utc>,
    /// Set while the user has forced a status; cleared on connect/disconnect
    explicit: bool,
}

/// Tracks presence for every user seen by this process
///
/// Records are created lazily on first connection and never deleted; a fully
/// disconnected user persists as offline with a last-seen stamp.
pub struct PresenceTracker {
    users: DashMap<UserId, PresenceState>,
}

impl PresenceTracker {
    /// Create an empty tracker
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: DashMap::new(),
        }
    }

    /// A connection opened for the user
    ///
    /// Recomputes to online, dropping any explicit override from a previous
    /// session.
    pub fn on_connection_opened(&self, user_id: UserId) -> Option<PresenceChange> {
        self.transition(user_id, PresenceStatus::Online, false)
    }

    /// A connection closed for the user
    ///
    /// `remaining` must be the post-close connection count snapshotted
    /// atomically by the registry. Zero remaining always derives offline,
    /// overriding any explicit status.
    pub fn on_connection_closed(
        &self,
        user_id: UserId,
        remaining: usize,
    ) -> Option<PresenceChange> {
        if remaining > 0 {
            return None;
        }
        self.transition(user_id, PresenceStatus::Offline, false)
    }

    /// The user explicitly requested a status
    ///
    /// Accepted even at zero connections (status bookkeeping only); the
    /// derived rule still wins on the next connect/disconnect.
    pub fn set_explicit(&self, user_id: UserId, status: PresenceStatus) -> Option<PresenceChange> {
        self.transition(user_id, status, true)
    }

    /// Get the current presence record for a user
    pub fn presence_of(&self, user_id: UserId) -> Option<UserPresence> {
        self.users.get(&user_id).map(|state| UserPresence {
            user_id,
            status: state.status,
            last_seen: state.last_seen,
        })
    }

    /// Number of users with a presence record
    pub fn tracked_users(&self) -> usize {
        self.users.len()
    }

    fn transition(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        explicit: bool,
    ) -> Option<PresenceChange> {
        let now = Utc::now();
        let mut state = self.users.entry(user_id).or_insert(PresenceState {
            status: PresenceStatus::Offline,
            last_seen: now,
            explicit: false,
        });

        let changed = state.status != status;
        state.explicit = explicit;
        if !changed {
            return None;
        }

        state.status = status;
        // Away is a soft state; last-seen tracks online/offline edges only
        if matches!(status, PresenceStatus::Online | PresenceStatus::Offline) {
            state.last_seen = now;
        }
        let last_seen = state.last_seen;
        drop(state);

        tracing::debug!(user_id = %user_id, status = %status, "Presence changed");

        Some(PresenceChange {
            user_id,
            status,
            last_seen,
        })
    }
}

impl Default for PresenceTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("users", &self.users.len())
            .finish()
    }
}
