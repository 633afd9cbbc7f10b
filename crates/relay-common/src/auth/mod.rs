//! Token verification utilities

mod jwt;

pub use jwt::{Claims, JwtError, JwtService};
