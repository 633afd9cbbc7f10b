//! Domain entities

mod message;
mod presence;

pub use message::{MessageKind, NewMessage, PersistedMessage};
pub use presence::{AuthIdentity, PresenceStatus, UserPresence};
