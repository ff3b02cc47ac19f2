pub mod config;
pub mod handler;
pub mod jobs;
pub mod processor;

pub use config::OutboxConfig;
pub use handler::{DispatchError, EventHandler, HandlerRegistry};
pub use jobs::{BackgroundJob, BackgroundJobRunner, OutboxProcessorJob, OutboxRetentionJob};
pub use processor::{BatchReport, OutboxProcessor};
