//! Retry policy: decides backoff delays.

use std::time::Duration;

/// Delays between delivery attempts, in minutes
pub const DEFAULT_RETRY_DELAYS_MINUTES: [u64; 5] = [1, 5, 30, 120, 480];

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Retry schedule for outbox messages.
///
/// The schedule is a fixed table rather than a formula; attempts past the
/// end of the table reuse the last delay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub delays: Vec<Duration>,
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delays: DEFAULT_RETRY_DELAYS_MINUTES
                .iter()
                .map(|m| Duration::from_secs(m * 60))
                .collect(),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }
}

impl RetryPolicy {
    pub fn new(delays: Vec<Duration>, max_attempts: u32) -> Self {
        Self {
            delays,
            max_attempts,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Delay before the next attempt.
    ///
    /// `attempts` is the number of failures so far (1-indexed). Zero is
    /// treated as one.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        if self.delays.is_empty() {
            return Duration::ZERO;
        }
        let index = (attempts.max(1) as usize).min(self.delays.len()) - 1;
        self.delays[index]
    }

    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minutes(m: u64) -> Duration {
        Duration::from_secs(m * 60)
    }

    #[test]
    fn default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.next_delay(1), minutes(1));
        assert_eq!(policy.next_delay(2), minutes(5));
        assert_eq!(policy.next_delay(3), minutes(30));
        assert_eq!(policy.next_delay(4), minutes(120));
        assert_eq!(policy.next_delay(5), minutes(480));
    }

    #[test]
    fn clamps_to_table_bounds() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay(0), minutes(1));
        assert_eq!(policy.next_delay(6), minutes(480));
        assert_eq!(policy.next_delay(u32::MAX), minutes(480));
    }

    #[test]
    fn empty_table_means_immediate_retry() {
        let policy = RetryPolicy::new(Vec::new(), 3);
        assert_eq!(policy.next_delay(2), Duration::ZERO);
    }

    #[test]
    fn exhaustion() {
        let policy = RetryPolicy::default().with_max_attempts(3);
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert!(policy.is_exhausted(4));
    }
}
