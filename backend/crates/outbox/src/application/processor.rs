//! Outbox relay
//!
//! Picks up ready messages, dispatches them to the registered handlers and
//! records the outcome on each message.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::JoinSet;

use super::config::OutboxConfig;
use super::handler::HandlerRegistry;
use crate::domain::message::OutboxMessage;
use crate::domain::repository::OutboxRepository;
use crate::domain::retry::RetryPolicy;
use crate::error::OutboxResult;

/// What happened during one relay pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchReport {
    pub fetched: usize,
    pub processed: usize,
    pub retried: usize,
    pub failed: usize,
}

impl BatchReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Processed => self.processed += 1,
            Outcome::Retried => self.retried += 1,
            Outcome::Failed => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Processed,
    Retried,
    Failed,
}

pub struct OutboxProcessor<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    repo: Arc<R>,
    registry: Arc<HandlerRegistry>,
    config: Arc<OutboxConfig>,
    policy: Arc<RetryPolicy>,
}

impl<R> OutboxProcessor<R>
where
    R: OutboxRepository + Send + Sync + 'static,
{
    pub fn new(repo: Arc<R>, registry: Arc<HandlerRegistry>, config: Arc<OutboxConfig>) -> Self {
        let policy = Arc::new(config.retry_policy());
        Self {
            repo,
            registry,
            config,
            policy,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repo
    }

    pub async fn process_batch(&self, now: DateTime<Utc>) -> OutboxResult<BatchReport> {
        let messages = self
            .repo
            .fetch_ready(now, self.config.batch_size, self.policy.max_attempts)
            .await?;

        let mut report = BatchReport {
            fetched: messages.len(),
            ..Default::default()
        };
        if messages.is_empty() {
            return Ok(report);
        }

        if self.config.process_in_order {
            for message in messages {
                let outcome =
                    handle_message(self.repo.as_ref(), &self.registry, &self.policy, message, now)
                        .await?;
                report.record(outcome);
            }
        } else {
            let mut set = JoinSet::new();
            for message in messages {
                let repo = self.repo.clone();
                let registry = self.registry.clone();
                let policy = self.policy.clone();
                set.spawn(async move {
                    handle_message(repo.as_ref(), &registry, &policy, message, now).await
                });
            }

            let mut first_error = None;
            while let Some(joined) = set.join_next().await {
                match joined {
                    Ok(Ok(outcome)) => report.record(outcome),
                    Ok(Err(e)) => {
                        tracing::error!(error = %e, "Failed to save outbox message");
                        first_error.get_or_insert(e);
                    }
                    Err(e) => tracing::error!(error = %e, "Outbox dispatch task panicked"),
                }
            }
            if let Some(e) = first_error {
                return Err(e);
            }
        }

        tracing::info!(
            fetched = report.fetched,
            processed = report.processed,
            retried = report.retried,
            failed = report.failed,
            "Outbox batch processed"
        );

        Ok(report)
    }
}

async fn handle_message<R>(
    repo: &R,
    registry: &HandlerRegistry,
    policy: &RetryPolicy,
    mut message: OutboxMessage,
    now: DateTime<Utc>,
) -> OutboxResult<Outcome>
where
    R: OutboxRepository + Send + Sync,
{
    let outcome = match registry.dispatch(&message).await {
        Ok(()) => {
            message.mark_processed(now);
            tracing::debug!(
                message_id = %message.id,
                event_type = %message.event_type,
                "Outbox message processed"
            );
            Outcome::Processed
        }
        Err(e) if e.is_permanent() => {
            message.mark_failed(&e.to_string(), now, policy);
            tracing::error!(
                message_id = %message.id,
                event_type = %message.event_type,
                error = %e,
                "Outbox message failed permanently"
            );
            Outcome::Failed
        }
        Err(e) => {
            message.mark_for_retry(&e.to_string(), now, policy);
            if message.is_permanently_failed() {
                tracing::warn!(
                    message_id = %message.id,
                    event_type = %message.event_type,
                    attempts = message.retry_count,
                    error = %e,
                    "Outbox message reached max retry attempts"
                );
                Outcome::Failed
            } else {
                tracing::warn!(
                    message_id = %message.id,
                    event_type = %message.event_type,
                    attempt = message.retry_count,
                    next_retry_at = ?message.next_retry_at,
                    error = %e,
                    "Outbox message will be retried"
                );
                Outcome::Retried
            }
        }
    };

    repo.save(&message).await?;
    Ok(outcome)
}
