//! Outbox repository trait

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::message::OutboxMessage;
use crate::error::OutboxResult;

/// Row counts by status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OutboxStats {
    pub pending: u64,
    pub processed: u64,
    pub failed: u64,
}

#[trait_variant::make(OutboxRepository: Send)]
pub trait LocalOutboxRepository {
    /// Unprocessed messages due at `now`, oldest `occurred_at` first
    async fn fetch_ready(
        &self,
        now: DateTime<Utc>,
        limit: u32,
        max_attempts: u32,
    ) -> OutboxResult<Vec<OutboxMessage>>;

    /// Insert or update one message
    async fn save(&self, message: &OutboxMessage) -> OutboxResult<()>;

    /// Insert or update several messages atomically
    async fn save_all(&self, messages: &[OutboxMessage]) -> OutboxResult<()>;

    /// Delete successfully processed messages older than `older_than`.
    /// Failed messages are kept for inspection.
    async fn purge_processed(&self, older_than: DateTime<Utc>) -> OutboxResult<u64>;

    async fn stats(&self) -> OutboxResult<OutboxStats>;
}
