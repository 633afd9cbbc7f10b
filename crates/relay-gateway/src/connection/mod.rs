//! Connection tracking

mod connection;
mod registry;

pub use connection::Connection;
pub use registry::ConnectionRegistry;
