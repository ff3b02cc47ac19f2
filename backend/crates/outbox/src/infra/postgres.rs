//! PostgreSQL outbox store (`shared.domain_events`)

use chrono::{DateTime, Utc};
use kernel::id::OutboxMessageId;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::domain::message::OutboxMessage;
use crate::domain::repository::{OutboxRepository, OutboxStats};
use crate::error::OutboxResult;

#[derive(Clone)]
pub struct PgOutboxRepository {
    pool: PgPool,
}

impl PgOutboxRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Stage messages inside a caller-owned transaction.
///
/// This is what makes the outbox transactional: the messages commit or
/// roll back together with the state change that produced them.
pub async fn insert_messages(
    conn: &mut PgConnection,
    messages: &[OutboxMessage],
) -> OutboxResult<()> {
    for message in messages {
        upsert(&mut *conn, message).await?;
    }
    Ok(())
}

async fn upsert(conn: &mut PgConnection, message: &OutboxMessage) -> OutboxResult<()> {
    sqlx::query(
        r#"
        INSERT INTO shared.domain_events (
            id,
            occurred_at,
            event_type,
            payload,
            processed_at,
            error,
            retry_count,
            next_retry_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        ON CONFLICT (id) DO UPDATE SET
            processed_at = EXCLUDED.processed_at,
            error = EXCLUDED.error,
            retry_count = EXCLUDED.retry_count,
            next_retry_at = EXCLUDED.next_retry_at
        "#,
    )
    .bind(message.id.as_uuid())
    .bind(message.occurred_at)
    .bind(&message.event_type)
    .bind(&message.payload)
    .bind(message.processed_at)
    .bind(message.error.as_deref())
    .bind(i32::try_from(message.retry_count).unwrap_or(i32::MAX))
    .bind(message.next_retry_at)
    .execute(conn)
    .await?;

    Ok(())
}

// ============================================================================
// Outbox Repository Implementation
// ============================================================================

impl OutboxRepository for PgOutboxRepository {
    async fn fetch_ready(
        &self,
        now: DateTime<Utc>,
        limit: u32,
        max_attempts: u32,
    ) -> OutboxResult<Vec<OutboxMessage>> {
        let rows = sqlx::query_as::<_, OutboxRow>(
            r#"
            SELECT
                id,
                occurred_at,
                event_type,
                payload,
                processed_at,
                error,
                retry_count,
                next_retry_at
            FROM shared.domain_events
            WHERE processed_at IS NULL
              AND retry_count < $2
              AND (next_retry_at IS NULL OR next_retry_at <= $1)
            ORDER BY occurred_at ASC
            LIMIT $3
            "#,
        )
        .bind(now)
        .bind(i32::try_from(max_attempts).unwrap_or(i32::MAX))
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(OutboxRow::into_message).collect())
    }

    async fn save(&self, message: &OutboxMessage) -> OutboxResult<()> {
        let mut conn = self.pool.acquire().await?;
        upsert(&mut conn, message).await
    }

    async fn save_all(&self, messages: &[OutboxMessage]) -> OutboxResult<()> {
        let mut tx = self.pool.begin().await?;
        insert_messages(&mut tx, messages).await?;
        tx.commit().await?;
        Ok(())
    }

    async fn purge_processed(&self, older_than: DateTime<Utc>) -> OutboxResult<u64> {
        let deleted = sqlx::query(
            r#"
            DELETE FROM shared.domain_events
            WHERE processed_at IS NOT NULL
              AND error IS NULL
              AND processed_at < $1
            "#,
        )
        .bind(older_than)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(deleted)
    }

    async fn stats(&self) -> OutboxResult<OutboxStats> {
        let (pending, processed, failed) = sqlx::query_as::<_, (i64, i64, i64)>(
            r#"
            SELECT
                COUNT(*) FILTER (WHERE processed_at IS NULL),
                COUNT(*) FILTER (WHERE processed_at IS NOT NULL AND error IS NULL),
                COUNT(*) FILTER (WHERE processed_at IS NOT NULL AND error IS NOT NULL)
            FROM shared.domain_events
            "#,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(OutboxStats {
            pending: pending.max(0) as u64,
            processed: processed.max(0) as u64,
            failed: failed.max(0) as u64,
        })
    }
}

// ============================================================================
// Row Types for sqlx mapping
// ============================================================================

#[derive(sqlx::FromRow)]
struct OutboxRow {
    id: Uuid,
    occurred_at: DateTime<Utc>,
    event_type: String,
    payload: serde_json::Value,
    processed_at: Option<DateTime<Utc>>,
    error: Option<String>,
    retry_count: i32,
    next_retry_at: Option<DateTime<Utc>>,
}

impl OutboxRow {
    fn into_message(self) -> OutboxMessage {
        OutboxMessage {
            id: OutboxMessageId::from_uuid(self.id),
            occurred_at: self.occurred_at,
            event_type: self.event_type,
            payload: self.payload,
            processed_at: self.processed_at,
            error: self.error,
            retry_count: u32::try_from(self.retry_count).unwrap_or(0),
            next_retry_at: self.next_retry_at,
        }
    }
}
