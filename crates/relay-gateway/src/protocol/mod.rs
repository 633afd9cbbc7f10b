//! Wire protocol
//!
//! JSON text frames both ways, each an `{"event": ..., "data": ...}`
//! envelope. Inbound and outbound events are closed tagged enums so payload
//! validation happens at the boundary, before anything reaches business
//! logic.

mod client;
mod server;

pub use client::{ClientEvent, RoomTarget, SendMessagePayload, StatusChangePayload};
pub use server::{ErrorPayload, MessagePayload, ServerEvent};
