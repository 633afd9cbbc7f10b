//! Gateway server setup
//!
//! Provides the WebSocket server configuration and routes.

mod handler;
mod state;

pub use handler::gateway_handler;
pub use state::GatewayState;

use crate::auth::AuthGate;
use crate::connection::ConnectionRegistry;
use crate::presence::PresenceTracker;
use crate::rooms::RoomMembership;
use crate::router::EventRouter;
use crate::typing::TypingCoordinator;
use axum::{routing::get, Router};
use relay_common::{AppConfig, AppError};
use relay_core::{ChatDirectory, CredentialVerifier, MessageStore, StatusStore};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;

/// Injected backing services
///
/// Everything the gateway needs from the outside world. Production wiring
/// hands in storage-backed implementations; tests hand in in-memory ones.
#[derive(Clone)]
pub struct Collaborators {
    pub directory: Arc<dyn ChatDirectory>,
    pub messages: Arc<dyn MessageStore>,
    pub statuses: Arc<dyn StatusStore>,
    pub verifier: Arc<dyn CredentialVerifier>,
}

/// Create the gateway router
pub fn create_router() -> Router<GatewayState> {
    Router::new()
        .route("/gateway", get(gateway_handler))
        .route("/health", get(health_check))
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "OK"
}

/// Build the complete application
pub fn create_app(state: GatewayState) -> Router {
    create_router()
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Assemble all gateway components and create `GatewayState`
///
/// Also starts the background typing-expiry sweeper; it runs for the
/// lifetime of the process.
pub fn create_gateway_state(config: AppConfig, collaborators: Collaborators) -> GatewayState {
    let registry = Arc::new(ConnectionRegistry::new());
    let rooms = Arc::new(RoomMembership::new(collaborators.directory.clone()));
    let typing = Arc::new(TypingCoordinator::new(config.typing.ttl()));
    let presence = Arc::new(PresenceTracker::new());

    let router = EventRouter::new(
        registry,
        rooms,
        typing,
        presence,
        collaborators.directory,
        collaborators.messages,
        collaborators.statuses,
        config.typing.sweep_interval(),
    );
    // The sweeper runs for the lifetime of the process
    let _ = router.spawn_typing_sweeper();

    let auth = Arc::new(AuthGate::new(collaborators.verifier));

    GatewayState::new(auth, router, config)
}

/// Run the gateway server
pub async fn run_server(app: Router, addr: SocketAddr) -> Result<(), AppError> {
    tracing::info!("Starting gateway server on {}", addr);

    let listener = TcpListener::bind(addr)
        .await
        .map_err(|e| AppError::Server(format!("Failed to bind to {addr}: {e}")))?;

    tracing::info!("Gateway listening on ws://{}/gateway", addr);

    axum::serve(listener, app)
        .await
        .map_err(|e| AppError::Server(format!("Server error: {e}")))?;

    Ok(())
}

/// Run the complete gateway server with configuration
pub async fn run(config: AppConfig, collaborators: Collaborators) -> Result<(), AppError> {
    let addr: SocketAddr = config
        .gateway
        .address()
        .parse()
        .map_err(|e| AppError::Config(format!("Invalid gateway address: {e}")))?;

    let state = create_gateway_state(config, collaborators);
    let app = create_app(state);

    run_server(app, addr).await
}
