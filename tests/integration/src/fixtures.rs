//! Test fixtures for gateway tests
//!
//! In-memory backing services, a token mint, and a direct router harness
//! that drives authenticated connections without a socket.

use async_trait::async_trait;
use relay_common::JwtService;
use relay_core::{
    AuthIdentity, ConnectionId, DomainError, DomainResult, MessageStore, NewMessage,
    PersistedMessage, RoomId, UserId,
};
use relay_gateway::auth::JwtVerifier;
use relay_gateway::connection::{Connection, ConnectionRegistry};
use relay_gateway::memory::{InMemoryChatDirectory, InMemoryMessageStore, InMemoryStatusStore};
use relay_gateway::presence::PresenceTracker;
use relay_gateway::protocol::ServerEvent;
use relay_gateway::rooms::RoomMembership;
use relay_gateway::router::EventRouter;
use relay_gateway::typing::{TypingCoordinator, DEFAULT_TYPING_TTL};
use relay_gateway::Collaborators;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Shared signing secret for test tokens
pub const TEST_JWT_SECRET: &str = "integration-test-secret";

/// Outbound buffer size for harness connections
pub const TEST_CONNECTION_BUFFER: usize = 64;

/// In-memory backing services plus a token mint
pub struct TestBackend {
    pub directory: Arc<InMemoryChatDirectory>,
    pub messages: Arc<InMemoryMessageStore>,
    pub statuses: Arc<InMemoryStatusStore>,
    pub jwt: JwtService,
}

impl TestBackend {
    pub fn new() -> Self {
        Self {
            directory: Arc::new(InMemoryChatDirectory::new()),
            messages: Arc::new(InMemoryMessageStore::new()),
            statuses: Arc::new(InMemoryStatusStore::new()),
            jwt: JwtService::new(TEST_JWT_SECRET, 900),
        }
    }

    /// Bundle the backing services for gateway wiring
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            directory: self.directory.clone(),
            messages: self.messages.clone(),
            statuses: self.statuses.clone(),
            verifier: Arc::new(JwtVerifier::new(self.jwt.clone())),
        }
    }

    /// Register a user profile for message denormalization
    pub fn seed_user(&self, user_id: UserId, name: &str) {
        self.messages.add_profile(AuthIdentity {
            user_id,
            display_name: name.to_string(),
            avatar: None,
        });
    }

    /// Make a user a member of a room, creating the room if needed
    pub fn seed_member(&self, room_id: RoomId, user_id: UserId) {
        self.directory.add_member(room_id, user_id);
    }

    /// Mint a valid access token for a user
    pub fn token_for(&self, user_id: UserId, name: &str) -> String {
        self.jwt
            .issue_access_token(user_id, name, None)
            .expect("token issuance")
    }
}

impl Default for TestBackend {
    fn default() -> Self {
        Self::new()
    }
}

/// Message store that always fails, for persistence-failure paths
pub struct FailingMessageStore;

#[async_trait]
impl MessageStore for FailingMessageStore {
    async fn create_message(&self, _message: NewMessage) -> DomainResult<PersistedMessage> {
        Err(DomainError::Storage("message store unavailable".to_string()))
    }
}

/// Router harness driving connections without a socket
///
/// No sweeper task is spawned: tests that exercise typing expiry call
/// `router.sweep_typing()` themselves under a paused clock.
pub struct RouterHarness {
    pub backend: TestBackend,
    pub router: Arc<EventRouter>,
}

impl RouterHarness {
    pub fn new() -> Self {
        let backend = TestBackend::new();
        let messages = backend.messages.clone();
        let router = build_router(&backend, messages);
        Self { backend, router }
    }

    /// Harness whose message store is replaced by the given one
    pub fn with_message_store(messages: Arc<dyn MessageStore>) -> Self {
        let backend = TestBackend::new();
        let router = build_router(&backend, messages);
        Self { backend, router }
    }

    /// Open an authenticated connection for a user
    ///
    /// Returns the connection plus the receiver draining its outbound
    /// buffer, standing in for the socket write task.
    pub async fn connect(
        &self,
        user_id: UserId,
        name: &str,
    ) -> (Arc<Connection>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(TEST_CONNECTION_BUFFER);
        let connection = Connection::new(
            ConnectionId::generate(),
            AuthIdentity {
                user_id,
                display_name: name.to_string(),
                avatar: None,
            },
            tx,
        );
        self.router.handle_connect(&connection).await;
        (connection, rx)
    }
}

impl Default for RouterHarness {
    fn default() -> Self {
        Self::new()
    }
}

fn build_router(backend: &TestBackend, messages: Arc<dyn MessageStore>) -> Arc<EventRouter> {
    EventRouter::new(
        Arc::new(ConnectionRegistry::new()),
        Arc::new(RoomMembership::new(backend.directory.clone())),
        Arc::new(TypingCoordinator::new(DEFAULT_TYPING_TTL)),
        Arc::new(PresenceTracker::new()),
        backend.directory.clone(),
        messages,
        backend.statuses.clone(),
        Duration::from_secs(1),
    )
}

/// Drain every event currently queued on a connection's receiver
pub fn drain_events(rx: &mut mpsc::Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

/// Take the next queued event, if any
pub fn next_event(rx: &mut mpsc::Receiver<ServerEvent>) -> Option<ServerEvent> {
    rx.try_recv().ok()
}
