pub mod event;
pub mod message;
pub mod repository;
pub mod retry;

pub use event::OutboxEvent;
pub use message::{OutboxMessage, OutboxStatus};
pub use repository::{OutboxRepository, OutboxStats};
pub use retry::RetryPolicy;
