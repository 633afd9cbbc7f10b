//! Value objects - identifier newtypes

mod ids;

pub use ids::{ConnectionId, IdParseError, MessageId, RoomId, UserId};
