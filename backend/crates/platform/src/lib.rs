//! Platform
//!
//! Domain-free building blocks for the users context: PBKDF2 password
//! hashing and policy, JWT access tokens with opaque refresh tokens,
//! signed one-off links, the refresh cookie and request metadata
//! (client address, user agent, correlation id).

pub mod client;
pub mod cookie;
pub mod correlation;
pub mod crypto;
pub mod jwt;
pub mod password;
pub mod token;
