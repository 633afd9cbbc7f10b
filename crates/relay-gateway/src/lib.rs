//! # relay-gateway
//!
//! Realtime session and fanout layer for the chat application: tracks live
//! connections, room subscriptions, presence, and ephemeral typing state,
//! and fans events out to subscriber connections over WebSocket.

pub mod auth;
pub mod connection;
pub mod memory;
pub mod presence;
pub mod protocol;
pub mod rooms;
pub mod router;
pub mod server;
pub mod typing;

pub use server::{create_app, create_gateway_state, run, run_server, Collaborators, GatewayState};
