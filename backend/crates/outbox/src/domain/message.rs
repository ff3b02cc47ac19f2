//! Outbox message entity
//!
//! One row per domain event. A message starts Pending, and either reaches
//! Processed after a successful dispatch or Failed once the retry ceiling
//! is hit or the failure cannot be retried.

use chrono::{DateTime, Utc};
use kernel::id::OutboxMessageId;

use super::event::OutboxEvent;
use super::retry::RetryPolicy;
use crate::error::{OutboxError, OutboxResult};

pub const MAX_EVENT_TYPE_LENGTH: usize = 500;
pub const MAX_ERROR_LENGTH: usize = 4000;
pub const PERMANENT_FAILURE_PREFIX: &str = "[PERMANENT FAILURE] ";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OutboxStatus {
    Pending,
    Processed,
    Failed,
}

impl OutboxStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutboxStatus::Pending => "pending",
            OutboxStatus::Processed => "processed",
            OutboxStatus::Failed => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutboxMessage {
    pub id: OutboxMessageId,
    pub occurred_at: DateTime<Utc>,
    pub event_type: String,
    pub payload: serde_json::Value,
    pub processed_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
    pub retry_count: u32,
    pub next_retry_at: Option<DateTime<Utc>>,
}

impl OutboxMessage {
    pub fn new(
        event_type: impl Into<String>,
        payload: serde_json::Value,
        occurred_at: DateTime<Utc>,
    ) -> OutboxResult<Self> {
        let event_type = event_type.into();
        if event_type.trim().is_empty() {
            return Err(OutboxError::InvalidEventType(
                "event type is required".to_string(),
            ));
        }
        if event_type.chars().count() > MAX_EVENT_TYPE_LENGTH {
            return Err(OutboxError::InvalidEventType(format!(
                "event type exceeds {MAX_EVENT_TYPE_LENGTH} characters"
            )));
        }

        Ok(Self {
            id: OutboxMessageId::new(),
            occurred_at,
            event_type,
            payload,
            processed_at: None,
            error: None,
            retry_count: 0,
            next_retry_at: None,
        })
    }

    pub fn from_event<E: OutboxEvent>(event: &E, occurred_at: DateTime<Utc>) -> OutboxResult<Self> {
        let payload = serde_json::to_value(event)?;
        Self::new(E::EVENT_TYPE, payload, occurred_at)
    }

    pub fn status(&self) -> OutboxStatus {
        match (self.processed_at, &self.error) {
            (None, _) => OutboxStatus::Pending,
            (Some(_), None) => OutboxStatus::Processed,
            (Some(_), Some(_)) => OutboxStatus::Failed,
        }
    }

    /// Whether the relay should pick this message up at `now`
    pub fn is_ready(&self, now: DateTime<Utc>, max_attempts: u32) -> bool {
        self.processed_at.is_none()
            && self.retry_count < max_attempts
            && self.next_retry_at.is_none_or(|at| at <= now)
    }

    pub fn mark_processed(&mut self, now: DateTime<Utc>) {
        self.processed_at = Some(now);
        self.error = None;
        self.next_retry_at = None;
    }

    /// Record a failed attempt and schedule the next one.
    ///
    /// Reaching the policy's ceiling turns this into [`Self::mark_failed`].
    pub fn mark_for_retry(&mut self, error: &str, now: DateTime<Utc>, policy: &RetryPolicy) {
        self.retry_count = self.retry_count.saturating_add(1);
        self.error = Some(truncate_error(error));

        if policy.is_exhausted(self.retry_count) {
            self.mark_failed(error, now, policy);
            return;
        }

        let delay = chrono::Duration::from_std(policy.next_delay(self.retry_count))
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.next_retry_at = Some(
            now.checked_add_signed(delay)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        );
    }

    /// Give up on the message for good
    pub fn mark_failed(&mut self, error: &str, now: DateTime<Utc>, policy: &RetryPolicy) {
        let message = if error.starts_with(PERMANENT_FAILURE_PREFIX) {
            error.to_string()
        } else {
            format!("{PERMANENT_FAILURE_PREFIX}{error}")
        };
        self.processed_at = Some(now);
        self.error = Some(truncate_error(&message));
        self.retry_count = policy.max_attempts;
        self.next_retry_at = None;
    }

    pub fn is_permanently_failed(&self) -> bool {
        self.status() == OutboxStatus::Failed
    }
}

fn truncate_error(error: &str) -> String {
    if error.chars().count() <= MAX_ERROR_LENGTH {
        error.to_string()
    } else {
        error.chars().take(MAX_ERROR_LENGTH).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use serde::{Deserialize, Serialize};

    #[derive(Serialize, Deserialize)]
    struct Pinged {
        n: u32,
    }

    impl OutboxEvent for Pinged {
        const EVENT_TYPE: &'static str = "test.pinged";
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 0).unwrap()
    }

    fn message() -> OutboxMessage {
        OutboxMessage::from_event(&Pinged { n: 7 }, now()).unwrap()
    }

    #[test]
    fn from_event_serializes_payload() {
        let msg = message();
        assert_eq!(msg.event_type, "test.pinged");
        assert_eq!(msg.payload, serde_json::json!({ "n": 7 }));
        assert_eq!(msg.status(), OutboxStatus::Pending);
        assert_eq!(msg.retry_count, 0);
        assert!(msg.is_ready(now(), 5));
    }

    #[test]
    fn rejects_bad_event_type() {
        assert!(OutboxMessage::new("", serde_json::Value::Null, now()).is_err());
        let long = "x".repeat(MAX_EVENT_TYPE_LENGTH + 1);
        assert!(OutboxMessage::new(long, serde_json::Value::Null, now()).is_err());
    }

    #[test]
    fn accepts_event_type_at_column_width() {
        let widest = "x".repeat(MAX_EVENT_TYPE_LENGTH);
        assert!(OutboxMessage::new(widest, serde_json::Value::Null, now()).is_ok());
    }

    #[test]
    fn mark_processed_clears_error() {
        let mut msg = message();
        msg.mark_for_retry("boom", now(), &RetryPolicy::default());
        msg.mark_processed(now());

        assert_eq!(msg.status(), OutboxStatus::Processed);
        assert!(msg.error.is_none());
        assert!(!msg.is_ready(now(), 5));
    }

    #[test]
    fn retry_schedule_follows_policy() {
        let policy = RetryPolicy::default();
        let mut msg = message();

        msg.mark_for_retry("first", now(), &policy);
        assert_eq!(msg.retry_count, 1);
        assert_eq!(msg.next_retry_at, Some(now() + Duration::minutes(1)));
        assert_eq!(msg.error.as_deref(), Some("first"));
        assert!(!msg.is_ready(now(), policy.max_attempts));
        assert!(msg.is_ready(now() + Duration::minutes(1), policy.max_attempts));

        msg.mark_for_retry("second", now(), &policy);
        assert_eq!(msg.next_retry_at, Some(now() + Duration::minutes(5)));

        msg.mark_for_retry("third", now(), &policy);
        assert_eq!(msg.next_retry_at, Some(now() + Duration::minutes(30)));

        msg.mark_for_retry("fourth", now(), &policy);
        assert_eq!(msg.next_retry_at, Some(now() + Duration::minutes(120)));
        assert_eq!(msg.status(), OutboxStatus::Pending);
    }

    #[test]
    fn reaching_ceiling_fails_permanently() {
        let policy = RetryPolicy::default();
        let mut msg = message();
        for _ in 0..policy.max_attempts {
            msg.mark_for_retry("still broken", now(), &policy);
        }

        assert_eq!(msg.status(), OutboxStatus::Failed);
        assert_eq!(msg.retry_count, policy.max_attempts);
        assert_eq!(
            msg.error.as_deref(),
            Some("[PERMANENT FAILURE] still broken")
        );
        assert_eq!(msg.processed_at, Some(now()));
        assert!(msg.next_retry_at.is_none());
        assert!(!msg.is_ready(now() + Duration::days(1), policy.max_attempts));
    }

    #[test]
    fn mark_failed_does_not_double_prefix() {
        let policy = RetryPolicy::default();
        let mut msg = message();
        msg.mark_failed("[PERMANENT FAILURE] bad payload", now(), &policy);
        assert_eq!(
            msg.error.as_deref(),
            Some("[PERMANENT FAILURE] bad payload")
        );
        assert!(msg.is_permanently_failed());
    }

    #[test]
    fn long_errors_are_truncated() {
        let mut msg = message();
        msg.mark_for_retry(&"e".repeat(MAX_ERROR_LENGTH * 2), now(), &RetryPolicy::default());
        assert_eq!(msg.error.unwrap().chars().count(), MAX_ERROR_LENGTH);
    }
}
