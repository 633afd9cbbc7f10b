//! WebSocket handler
//!
//! Authenticates the handshake before the upgrade is accepted, then runs
//! one read loop and one write loop per connection. A single connection's
//! inbound events are processed in arrival order by its read loop.

use crate::connection::Connection;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::router::{EventRouter, GatewayError};
use crate::server::GatewayState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        Query, State, WebSocketUpgrade,
    },
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::{SinkExt, StreamExt};
use relay_core::ConnectionId;
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Handshake query parameters
#[derive(Debug, Deserialize)]
pub struct GatewayQuery {
    /// Bearer credential; the Authorization header works too
    token: Option<String>,
}

/// WebSocket gateway handler
///
/// The credential is verified here, before `on_upgrade`: a rejected token
/// gets a 401 and no gateway state is ever created for the connection.
pub async fn gateway_handler(
    State(state): State<GatewayState>,
    Query(query): Query<GatewayQuery>,
    headers: HeaderMap,
    ws: WebSocketUpgrade,
) -> Response {
    let credential = query.token.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .map(String::from)
    });

    let Some(credential) = credential else {
        return StatusCode::UNAUTHORIZED.into_response();
    };

    match state.auth().authenticate(&credential).await {
        Ok(identity) => ws
            .on_upgrade(move |socket| handle_socket(state, socket, identity))
            .into_response(),
        Err(err) => {
            tracing::debug!(error = %err, "Handshake rejected");
            StatusCode::UNAUTHORIZED.into_response()
        }
    }
}

/// Drive an upgraded, authenticated WebSocket connection
async fn handle_socket(state: GatewayState, socket: WebSocket, identity: relay_core::AuthIdentity) {
    let connection_id = ConnectionId::generate();
    let buffer = state.config().limits.connection_buffer;

    let (tx, mut rx) = mpsc::channel::<ServerEvent>(buffer);
    let connection = Connection::new(connection_id, identity, tx);
    let router = Arc::clone(state.router());

    router.handle_connect(&connection).await;

    tracing::info!(
        connection_id = %connection_id,
        user_id = %connection.user_id(),
        "WebSocket connection established"
    );

    let (mut ws_sink, mut ws_stream) = socket.split();

    // Read loop: parse and dispatch inbound events in arrival order
    let router_recv = Arc::clone(&router);
    let connection_recv = Arc::clone(&connection);
    let recv_task = tokio::spawn(async move {
        while let Some(msg) = ws_stream.next().await {
            match msg {
                Ok(Message::Text(text)) => {
                    handle_text_frame(&router_recv, &connection_recv, &text).await;
                }
                Ok(Message::Binary(_)) => {
                    tracing::debug!(
                        connection_id = %connection_recv.id(),
                        "Binary frames not supported"
                    );
                    let _ = connection_recv.send(
                        GatewayError::Validation("Binary frames are not supported".to_string())
                            .to_event(),
                    );
                }
                Ok(Message::Ping(_) | Message::Pong(_)) => {
                    // Pong replies are handled by axum
                }
                Ok(Message::Close(_)) => {
                    tracing::debug!(
                        connection_id = %connection_recv.id(),
                        "Client closed connection"
                    );
                    break;
                }
                Err(e) => {
                    tracing::debug!(
                        connection_id = %connection_recv.id(),
                        error = %e,
                        "WebSocket error"
                    );
                    break;
                }
            }
        }
    });

    // Write loop: drain the outbound channel into the socket
    let send_task = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            match event.to_json() {
                Ok(json) => {
                    if ws_sink.send(Message::Text(json)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to serialize outbound event");
                }
            }
        }
        let _ = ws_sink.close().await;
    });

    // Either half ending tears the connection down
    tokio::select! {
        _ = recv_task => {}
        _ = send_task => {}
    }

    router.handle_disconnect(&connection).await;
}

/// Parse one text frame and dispatch it
async fn handle_text_frame(router: &Arc<EventRouter>, connection: &Arc<Connection>, text: &str) {
    match serde_json::from_str::<ClientEvent>(text) {
        Ok(event) => {
            tracing::trace!(
                connection_id = %connection.id(),
                event = event.name(),
                "Inbound event"
            );
            router.dispatch(connection, event).await;
        }
        Err(e) => {
            tracing::debug!(
                connection_id = %connection.id(),
                error = %e,
                "Failed to parse inbound frame"
            );
            let _ = connection.send(
                GatewayError::Validation("Malformed event payload".to_string()).to_event(),
            );
        }
    }
}
