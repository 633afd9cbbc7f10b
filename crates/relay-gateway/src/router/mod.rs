//! Event router
//!
//! Single dispatch point for inbound events and the only place outbound
//! fanout happens. Handlers enforce per-event authorization, call out to
//! the persistence collaborators, and report failures back to the
//! originating connection only. The persistence/API layer emits its own
//! notifications (message edits, deletions) through the public fanout
//! surface instead of reaching into connections directly.

mod error;

pub use error::GatewayError;

use crate::connection::{Connection, ConnectionRegistry};
use crate::presence::{PresenceChange, PresenceTracker};
use crate::protocol::{ClientEvent, SendMessagePayload, ServerEvent};
use crate::rooms::{JoinOutcome, LeaveOutcome, RoomMembership};
use crate::typing::TypingCoordinator;
use relay_core::{
    ChatDirectory, MessageStore, NewMessage, PersistedMessage, PresenceStatus, RoomId,
    StatusStore, UserId,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use validator::Validate;

/// Routes inbound events and fans out outbound ones
pub struct EventRouter {
    registry: Arc<ConnectionRegistry>,
    rooms: Arc<RoomMembership>,
    typing: Arc<TypingCoordinator>,
    presence: Arc<PresenceTracker>,
    directory: Arc<dyn ChatDirectory>,
    messages: Arc<dyn MessageStore>,
    statuses: Arc<dyn StatusStore>,
    sweep_interval: Duration,
}

impl EventRouter {
    /// Create a router over the given components and collaborators
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        rooms: Arc<RoomMembership>,
        typing: Arc<TypingCoordinator>,
        presence: Arc<PresenceTracker>,
        directory: Arc<dyn ChatDirectory>,
        messages: Arc<dyn MessageStore>,
        statuses: Arc<dyn StatusStore>,
        sweep_interval: Duration,
    ) -> Arc<Self> {
        Arc::new(Self {
            registry,
            rooms,
            typing,
            presence,
            directory,
            messages,
            statuses,
            sweep_interval,
        })
    }

    /// Get the connection registry
    pub fn registry(&self) -> &ConnectionRegistry {
        &self.registry
    }

    /// Get the room membership tracker
    pub fn rooms(&self) -> &RoomMembership {
        &self.rooms
    }

    /// Get the typing coordinator
    pub fn typing(&self) -> &TypingCoordinator {
        &self.typing
    }

    /// Get the presence tracker
    pub fn presence(&self) -> &PresenceTracker {
        &self.presence
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// Register a freshly authenticated connection
    ///
    /// Auto-subscribes the user's existing rooms (the directory is the
    /// authority, so no re-validation and no join notifications) and moves
    /// presence toward online.
    pub async fn handle_connect(&self, connection: &Arc<Connection>) {
        let user_id = connection.user_id();
        self.registry.register(connection.clone());

        match self.directory.rooms_of(user_id).await {
            Ok(room_ids) => {
                for room_id in &room_ids {
                    self.rooms
                        .subscribe_unchecked(user_id, connection.id(), *room_id);
                }
                tracing::debug!(
                    user_id = %user_id,
                    connection_id = %connection.id(),
                    rooms = room_ids.len(),
                    "Connection auto-subscribed to rooms"
                );
            }
            Err(e) => {
                // The user can still join rooms explicitly
                tracing::warn!(user_id = %user_id, error = %e, "Room auto-subscribe failed");
            }
        }

        if let Some(change) = self.presence.on_connection_opened(user_id) {
            self.publish_presence(change).await;
        }
    }

    /// Unwind a disconnected connection
    ///
    /// Releases typing entries, room subscriptions, and the registry entry
    /// in that order, then recomputes presence from the atomically
    /// snapshotted remaining-connection count.
    pub async fn handle_disconnect(&self, connection: &Arc<Connection>) {
        let user_id = connection.user_id();
        let connection_id = connection.id();

        for room_id in self.typing.unwind_user(user_id) {
            self.send_to_room(
                room_id,
                &ServerEvent::UserStoppedTyping { room_id, user_id },
                Some(user_id),
            );
        }

        for room_id in self.rooms.unwind_connection(connection_id, user_id) {
            self.send_to_room(
                room_id,
                &ServerEvent::UserLeftChat { room_id, user_id },
                Some(user_id),
            );
        }

        if let Some((user_id, remaining)) = self.registry.unregister(connection_id) {
            if let Some(change) = self.presence.on_connection_closed(user_id, remaining) {
                self.publish_presence(change).await;
            }
        }

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            "Connection unwound"
        );
    }

    // ========================================================================
    // Inbound dispatch
    // ========================================================================

    /// Handle one inbound event from a connection
    ///
    /// Failures never escape this boundary: they become an `error` event for
    /// the originating connection and the shared service keeps running.
    pub async fn dispatch(&self, connection: &Arc<Connection>, event: ClientEvent) {
        let name = event.name();

        let result = match event {
            ClientEvent::JoinChat(target) => self.handle_join(connection, target.room_id).await,
            ClientEvent::LeaveChat(target) => self.handle_leave(connection, target.room_id).await,
            ClientEvent::SendMessage(payload) => self.handle_send(connection, payload).await,
            ClientEvent::TypingStart(target) => self.handle_typing_start(connection, target.room_id),
            ClientEvent::TypingStop(target) => self.handle_typing_stop(connection, target.room_id),
            ClientEvent::UserStatusChange(payload) => {
                self.handle_status_change(connection, payload.status).await
            }
        };

        if let Err(err) = result {
            tracing::debug!(
                connection_id = %connection.id(),
                user_id = %connection.user_id(),
                event = name,
                error = %err,
                "Inbound event failed"
            );
            self.send_error(connection, &err);
        }
    }

    async fn handle_join(
        &self,
        connection: &Arc<Connection>,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();
        let outcome = self.rooms.join(user_id, connection.id(), room_id).await?;

        if outcome == JoinOutcome::Subscribed {
            self.send_to_room(
                room_id,
                &ServerEvent::UserJoinedChat { room_id, user_id },
                Some(user_id),
            );
            tracing::debug!(user_id = %user_id, room_id = %room_id, "User joined room");
        }

        Ok(())
    }

    async fn handle_leave(
        &self,
        connection: &Arc<Connection>,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();

        if self.rooms.leave(user_id, connection.id(), room_id) == LeaveOutcome::UserLeft {
            // The user is out of the room; their typing entry goes with them
            if self.typing.stop(user_id, room_id) {
                self.send_to_room(
                    room_id,
                    &ServerEvent::UserStoppedTyping { room_id, user_id },
                    Some(user_id),
                );
            }

            self.send_to_room(
                room_id,
                &ServerEvent::UserLeftChat { room_id, user_id },
                Some(user_id),
            );
            tracing::debug!(user_id = %user_id, room_id = %room_id, "User left room");
        }

        Ok(())
    }

    async fn handle_send(
        &self,
        connection: &Arc<Connection>,
        payload: SendMessagePayload,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();
        let room_id = payload.room_id;

        payload
            .validate()
            .map_err(|e| GatewayError::Validation(e.to_string()))?;

        // Membership is re-validated against the directory on every send
        if !self.directory.is_member(user_id, room_id).await? {
            return Err(GatewayError::NotRoomMember);
        }

        // Only the persisted representation is ever broadcast
        let message = self
            .messages
            .create_message(NewMessage {
                room_id,
                sender_id: user_id,
                content: payload.content,
                kind: payload.kind,
                media_url: payload.media_url,
                reply_to: payload.reply_to,
            })
            .await?;

        tracing::debug!(
            message_id = %message.id,
            room_id = %room_id,
            user_id = %user_id,
            "Message persisted"
        );

        // The sender's own connections get the echo as the delivery ack
        self.send_to_room(room_id, &ServerEvent::MessageReceived(message.into()), None);

        Ok(())
    }

    fn handle_typing_start(
        &self,
        connection: &Arc<Connection>,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();

        if !self.rooms.is_subscribed(user_id, room_id) {
            return Err(GatewayError::NotRoomMember);
        }

        self.typing.start(user_id, room_id);
        self.send_to_room(
            room_id,
            &ServerEvent::UserTyping {
                room_id,
                user_id,
                user_name: connection.display_name().to_string(),
            },
            Some(user_id),
        );

        Ok(())
    }

    fn handle_typing_stop(
        &self,
        connection: &Arc<Connection>,
        room_id: RoomId,
    ) -> Result<(), GatewayError> {
        let user_id = connection.user_id();

        // Idempotent: no entry, no broadcast
        if self.typing.stop(user_id, room_id) {
            self.send_to_room(
                room_id,
                &ServerEvent::UserStoppedTyping { room_id, user_id },
                Some(user_id),
            );
        }

        Ok(())
    }

    async fn handle_status_change(
        &self,
        connection: &Arc<Connection>,
        status: PresenceStatus,
    ) -> Result<(), GatewayError> {
        if let Some(change) = self.presence.set_explicit(connection.user_id(), status) {
            self.publish_presence(change).await;
        }
        Ok(())
    }

    // ========================================================================
    // Outbound fanout
    // ========================================================================

    /// Fan an event out to every connection subscribed to a room
    ///
    /// Fire-and-forget per connection; one failed delivery never blocks the
    /// rest.
    fn send_to_room(
        &self,
        room_id: RoomId,
        event: &ServerEvent,
        exclude_user: Option<UserId>,
    ) -> usize {
        let mut sent = 0;

        for (user_id, connection_id) in self.rooms.connections_in(room_id) {
            if exclude_user == Some(user_id) {
                continue;
            }
            if let Some(conn) = self.registry.get(connection_id) {
                if conn.send(event.clone()).is_ok() {
                    sent += 1;
                }
            }
        }

        tracing::trace!(
            room_id = %room_id,
            event = event.name(),
            sent = sent,
            "Event sent to room"
        );

        sent
    }

    fn send_error(&self, connection: &Arc<Connection>, err: &GatewayError) {
        if connection.send(err.to_event()).is_err() {
            tracing::debug!(
                connection_id = %connection.id(),
                "Failed to deliver error event"
            );
        }
    }

    async fn publish_presence(&self, change: PresenceChange) {
        // Best-effort persistence; the broadcast still goes out on failure
        if let Err(e) = self
            .statuses
            .set_user_status(change.user_id, change.status, change.last_seen)
            .await
        {
            tracing::warn!(user_id = %change.user_id, error = %e, "Status persistence failed");
        }

        self.registry.broadcast(&ServerEvent::UserStatusChanged {
            user_id: change.user_id,
            status: change.status,
            last_seen: change.last_seen,
        });
    }

    // ========================================================================
    // Public fanout surface (for the persistence/API layer)
    // ========================================================================

    /// Send an event to every connection subscribed to a room
    pub fn emit_to_room(&self, room_id: RoomId, event: &ServerEvent) -> usize {
        self.send_to_room(room_id, event, None)
    }

    /// Send an event to every connection of a user
    pub fn emit_to_user(&self, user_id: UserId, event: &ServerEvent) -> usize {
        self.registry.send_to_user(user_id, event)
    }

    /// Send an event to every live connection
    pub fn emit_to_all(&self, event: &ServerEvent) -> usize {
        self.registry.broadcast(event)
    }

    /// Notify a room that a message was edited
    pub fn broadcast_message_updated(&self, message: PersistedMessage) -> usize {
        let room_id = message.room_id;
        self.emit_to_room(room_id, &ServerEvent::MessageUpdated(message.into()))
    }

    /// Notify a room that a message was deleted
    pub fn broadcast_message_deleted(
        &self,
        room_id: RoomId,
        message_id: relay_core::MessageId,
    ) -> usize {
        self.emit_to_room(
            room_id,
            &ServerEvent::MessageDeleted {
                room_id,
                message_id,
            },
        )
    }

    // ========================================================================
    // Typing expiry
    // ========================================================================

    /// Remove expired typing entries and broadcast their disappearance
    ///
    /// Returns how many entries expired. Called by the sweep task, exposed
    /// for tests that drive a paused clock.
    pub fn sweep_typing(&self) -> usize {
        let expired = self.typing.collect_expired();
        let count = expired.len();

        for (room_id, user_id) in expired {
            self.send_to_room(
                room_id,
                &ServerEvent::UserStoppedTyping { room_id, user_id },
                Some(user_id),
            );
            tracing::trace!(user_id = %user_id, room_id = %room_id, "Typing entry expired");
        }

        count
    }

    /// Spawn the background task enforcing typing expiry
    ///
    /// Runs until the returned handle is aborted or the runtime shuts down.
    pub fn spawn_typing_sweeper(self: &Arc<Self>) -> JoinHandle<()> {
        let router = Arc::clone(self);

        tokio::spawn(async move {
            let mut tick = tokio::time::interval(router.sweep_interval);
            loop {
                tick.tick().await;
                router.sweep_typing();
            }
        })
    }
}

impl std::fmt::Debug for EventRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventRouter")
            .field("registry", &self.registry)
            .field("rooms", &self.rooms)
            .finish()
    }
}
