//! Users Bounded Context
//!
//! Clean Architecture structure:
//! - `domain/` - Entities, value objects, domain events, repository traits
//! - `application/` - Use cases, outbox consumers, background jobs
//! - `infra/` - PostgreSQL store with transactional outbox writes
//! - `presentation/` - HTTP handlers, DTOs, router, auth middleware
//!
//! ## Features
//! - Registration with email confirmation, login, refresh token rotation
//! - Profile, addresses, notification preferences and in-app notifications
//! - Device sessions and login history
//! - Role and permission administration
//!
//! ## Security Model
//! - Passwords hashed with PBKDF2-HMAC-SHA256, rehashed on login when the
//!   stored work factor is below the configured one
//! - Short-lived JWT access tokens; refresh tokens stored as SHA-256 hashes
//!   and rotated on every use
//! - Lockout after repeated failed logins
//! - Email links signed per purpose and bound to the security stamp

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;
pub mod presentation;

// Re-exports for convenience
pub use application::config::UsersConfig;
pub use application::email::{AccountMailer, EmailSender, LoggingEmailSender};
pub use application::event_handlers::register_handlers;
pub use application::jobs::ExpiredSessionCleanupJob;
pub use domain::repository::UsersStore;
pub use error::{UsersError, UsersResult};
pub use infra::postgres::PgUsersRepository;
pub use presentation::handlers::UsersAppState;
pub use presentation::router::{admin_router, auth_router, me_router, users_router};

// Re-export kernel error types for unified error handling
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};
