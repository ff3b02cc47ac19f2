//! Transactional Outbox
//!
//! Clean Architecture structure:
//! - `domain/` - Outbox message state machine, retry policy, repository trait
//! - `application/` - Handler registry, relay processor, background jobs
//! - `infra/` - PostgreSQL store
//!
//! ## Delivery Model
//! - Events are written to `shared.domain_events` in the same transaction
//!   as the state change that raised them
//! - A polling relay dispatches ready messages to typed handlers
//! - Failures back off on a fixed schedule (1, 5, 30, 120, 480 minutes)
//!   until the retry ceiling marks the message permanently failed
//! - Delivery is at-least-once; handlers must be idempotent

pub mod application;
pub mod domain;
pub mod error;
pub mod infra;

pub use application::{
    BackgroundJob, BackgroundJobRunner, BatchReport, DispatchError, EventHandler,
    HandlerRegistry, OutboxConfig, OutboxProcessor, OutboxProcessorJob, OutboxRetentionJob,
};
pub use domain::{
    OutboxEvent, OutboxMessage, OutboxRepository, OutboxStats, OutboxStatus, RetryPolicy,
};
pub use error::{OutboxError, OutboxResult};
pub use infra::postgres::{PgOutboxRepository, insert_messages};

#[cfg(test)]
mod tests;
