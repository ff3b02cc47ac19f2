//! Outbox relay configuration

use std::time::Duration;

use crate::domain::retry::{DEFAULT_MAX_ATTEMPTS, RetryPolicy};

#[derive(Debug, Clone)]
pub struct OutboxConfig {
    /// Run the relay and retention jobs at all
    pub enabled: bool,
    /// Pause between relay batches
    pub polling_interval: Duration,
    /// Messages fetched per batch
    pub batch_size: u32,
    pub max_retry_attempts: u32,
    /// Processed messages older than this are purged
    pub retention: Duration,
    /// How often the retention job runs
    pub retention_interval: Duration,
    /// Dispatch sequentially in `occurred_at` order instead of concurrently
    pub process_in_order: bool,
}

impl Default for OutboxConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            polling_interval: Duration::from_secs(10),
            batch_size: 20,
            max_retry_attempts: DEFAULT_MAX_ATTEMPTS,
            retention: Duration::from_secs(7 * 24 * 3600),
            retention_interval: Duration::from_secs(3600),
            process_in_order: true,
        }
    }
}

impl OutboxConfig {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::default().with_max_attempts(self.max_retry_attempts)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.polling_interval.is_zero() {
            return Err("outbox polling interval must be positive".to_string());
        }
        if self.batch_size == 0 {
            return Err("outbox batch size must be positive".to_string());
        }
        if self.max_retry_attempts == 0 {
            return Err("outbox max retry attempts must be positive".to_string());
        }
        if self.retention.is_zero() {
            return Err("outbox retention must be positive".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OutboxConfig::default();
        assert!(config.enabled);
        assert!(config.process_in_order);
        assert_eq!(config.polling_interval, Duration::from_secs(10));
        assert_eq!(config.batch_size, 20);
        assert_eq!(config.retry_policy().max_attempts, 5);
        assert_eq!(config.retention, Duration::from_secs(604_800));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_batch() {
        let config = OutboxConfig {
            batch_size: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
