//! # relay-core
//!
//! Domain layer for the realtime gateway: identifiers, entities, and the
//! collaborator traits through which storage and credential verification
//! are consumed. This crate has zero dependencies on infrastructure
//! (database, web framework, etc.).

pub mod entities;
pub mod error;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    AuthIdentity, MessageKind, NewMessage, PersistedMessage, PresenceStatus, UserPresence,
};
pub use error::DomainError;
pub use traits::{ChatDirectory, CredentialVerifier, DomainResult, MessageStore, StatusStore};
pub use value_objects::{ConnectionId, IdParseError, MessageId, RoomId, UserId};
