//! Integration test utilities for the relay gateway
//!
//! This crate provides helpers for running end-to-end tests against
//! the WebSocket gateway, plus a direct router harness for tests that
//! exercise routing semantics without a socket.

pub mod fixtures;

pub use fixtures::*;
pub use helpers::*;
