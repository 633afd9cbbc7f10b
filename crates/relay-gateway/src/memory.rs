//! In-memory collaborator implementations
//!
//! Backing implementations of the collaborator traits for development
//! wiring and tests. Production deployments inject storage-backed
//! implementations instead.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use relay_core::{
    AuthIdentity, ChatDirectory, DomainError, DomainResult, MessageId, MessageStore, NewMessage,
    PersistedMessage, PresenceStatus, RoomId, StatusStore, UserId,
};
use std::collections::HashSet;
use std::sync::atomic::{AtomicI64, Ordering};

/// Room membership held in process memory
#[derive(Debug, Default)]
pub struct InMemoryChatDirectory {
    rooms: DashMap<RoomId, HashSet<UserId>>,
}

impl InMemoryChatDirectory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a room (possibly empty)
    pub fn add_room(&self, room_id: RoomId) {
        self.rooms.entry(room_id).or_default();
    }

    /// Add a member to a room, creating the room if needed
    pub fn add_member(&self, room_id: RoomId, user_id: UserId) {
        self.rooms.entry(room_id).or_default().insert(user_id);
    }

    /// Remove a member from a room
    pub fn remove_member(&self, room_id: RoomId, user_id: UserId) {
        if let Some(mut members) = self.rooms.get_mut(&room_id) {
            members.remove(&user_id);
        }
    }
}

#[async_trait]
impl ChatDirectory for InMemoryChatDirectory {
    async fn is_member(&self, user_id: UserId, room_id: RoomId) -> DomainResult<bool> {
        self.rooms
            .get(&room_id)
            .map(|members| members.contains(&user_id))
            .ok_or(DomainError::RoomNotFound(room_id))
    }

    async fn members_of(&self, room_id: RoomId) -> DomainResult<Vec<UserId>> {
        self.rooms
            .get(&room_id)
            .map(|members| members.iter().copied().collect())
            .ok_or(DomainError::RoomNotFound(room_id))
    }

    async fn rooms_of(&self, user_id: UserId) -> DomainResult<Vec<RoomId>> {
        Ok(self
            .rooms
            .iter()
            .filter(|entry| entry.value().contains(&user_id))
            .map(|entry| *entry.key())
            .collect())
    }
}

/// Message store held in process memory
///
/// Sender display fields are denormalized from registered profiles, the way
/// a real store would join them in.
#[derive(Debug, Default)]
pub struct InMemoryMessageStore {
    next_id: AtomicI64,
    messages: DashMap<MessageId, PersistedMessage>,
    profiles: DashMap<UserId, AuthIdentity>,
}

impl InMemoryMessageStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            messages: DashMap::new(),
            profiles: DashMap::new(),
        }
    }

    /// Register a sender profile for display-field denormalization
    pub fn add_profile(&self, identity: AuthIdentity) {
        self.profiles.insert(identity.user_id, identity);
    }

    /// Look up a stored message
    pub fn get(&self, id: MessageId) -> Option<PersistedMessage> {
        self.messages.get(&id).map(|m| m.clone())
    }

    /// Number of stored messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// True when nothing has been stored
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

#[async_trait]
impl MessageStore for InMemoryMessageStore {
    async fn create_message(&self, message: NewMessage) -> DomainResult<PersistedMessage> {
        let sender = self
            .profiles
            .get(&message.sender_id)
            .map(|p| p.clone())
            .ok_or(DomainError::UserNotFound(message.sender_id))?;

        let now = Utc::now();
        let persisted = PersistedMessage {
            id: MessageId::new(self.next_id.fetch_add(1, Ordering::SeqCst)),
            room_id: message.room_id,
            sender_id: message.sender_id,
            sender_name: sender.display_name,
            sender_avatar: sender.avatar,
            content: message.content,
            kind: message.kind,
            media_url: message.media_url,
            reply_to: message.reply_to,
            edited: false,
            created_at: now,
            updated_at: now,
        };

        self.messages.insert(persisted.id, persisted.clone());
        Ok(persisted)
    }
}

/// Status store held in process memory
#[derive(Debug, Default)]
pub struct InMemoryStatusStore {
    statuses: DashMap<UserId, (PresenceStatus, DateTime<Utc>)>,
}

impl InMemoryStatusStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the last recorded status for a user
    pub fn status_of(&self, user_id: UserId) -> Option<(PresenceStatus, DateTime<Utc>)> {
        self.statuses.get(&user_id).map(|s| *s)
    }
}

#[async_trait]
impl StatusStore for InMemoryStatusStore {
    async fn set_user_status(
        &self,
        user_id: UserId,
        status: PresenceStatus,
        last_seen: DateTime<Utc>,
    ) -> DomainResult<()> {
        self.statuses.insert(user_id, (status, last_seen));
        Ok(())
    }
}
