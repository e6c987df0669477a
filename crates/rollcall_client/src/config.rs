//! Configuration for the sync client.

use std::time::Duration;

/// Configuration for sync operations.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Page size asked for on every pull.
    pub pull_batch_size: u32,
    /// Maximum records sent in one push.
    pub push_batch_size: u32,
    /// Retry configuration.
    pub retry: RetryConfig,
}

impl ClientConfig {
    /// Creates a new sync configuration.
    pub fn new() -> Self {
        Self {
            pull_batch_size: 100,
            push_batch_size: 100,
            retry: RetryConfig::default(),
        }
    }

    /// Sets the pull batch size.
    pub fn with_pull_batch_size(mut self, size: u32) -> Self {
        self.pull_batch_size = size;
        self
    }

    /// Sets the push batch size.
    pub fn with_push_batch_size(mut self, size: u32) -> Self {
        self.push_batch_size = size;
        self
    }

    /// Sets the retry configuration.
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Configuration for retry behavior.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts per request, the first one included.
    pub max_attempts: u32,
    /// Initial delay between retries.
    pub initial_delay: Duration,
    /// Maximum delay between retries.
    pub max_delay: Duration,
    /// Multiplier for exponential backoff.
    pub backoff_multiplier: f64,
    /// Whether to add jitter to delays.
    pub add_jitter: bool,
}

impl RetryConfig {
    /// Creates a new retry configuration.
    pub fn new(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            backoff_multiplier: 2.0,
            add_jitter: true,
        }
    }

    /// Creates a configuration with no retries.
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            initial_delay: Duration::ZERO,
            max_delay: Duration::ZERO,
            backoff_multiplier: 1.0,
            add_jitter: false,
        }
    }

    /// Retries `max_attempts - 1` times without waiting. For tests.
    pub fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            ..Self::no_retry()
        }
    }

    /// Sets the initial delay.
    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    /// Sets the maximum delay.
    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Sets the backoff multiplier.
    pub fn with_backoff_multiplier(mut self, multiplier: f64) -> Self {
        self.backoff_multiplier = multiplier;
        self
    }

    /// Enables or disables jitter.
    pub fn with_jitter(mut self, enabled: bool) -> Self {
        self.add_jitter = enabled;
        self
    }

    /// Calculates the delay for a given attempt (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = i32::try_from(attempt.saturating_sub(1)).unwrap_or(i32::MAX);
        let base_delay = self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent);
        let delay_secs = base_delay.min(self.max_delay.as_secs_f64());

        if self.add_jitter {
            // Up to 25% extra
            let jitter = delay_secs * 0.25 * jitter_fraction();
            Duration::from_secs_f64(delay_secs + jitter)
        } else {
            Duration::from_secs_f64(delay_secs)
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::new(3)
    }
}

/// Cheap pseudo-random fraction in `[0, 1)` from the clock's sub-second part.
fn jitter_fraction() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    f64::from(nanos % 1000) / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_config_builder() {
        let config = ClientConfig::new()
            .with_pull_batch_size(50)
            .with_push_batch_size(25)
            .with_retry(RetryConfig::no_retry());

        assert_eq!(config.pull_batch_size, 50);
        assert_eq!(config.push_batch_size, 25);
        assert_eq!(config.retry.max_attempts, 1);
    }

    #[test]
    fn retry_delay_calculation() {
        let config = RetryConfig::new(5)
            .with_initial_delay(Duration::from_millis(100))
            .with_backoff_multiplier(2.0);

        assert_eq!(config.delay_for_attempt(0), Duration::ZERO);

        // Jitter makes exact values unpredictable; check bounds.
        let delay1 = config.delay_for_attempt(1);
        assert!(delay1 >= Duration::from_millis(100));
        assert!(delay1 <= Duration::from_millis(125));

        let delay2 = config.delay_for_attempt(2);
        assert!(delay2 >= Duration::from_millis(200));
    }

    #[test]
    fn retry_delay_without_jitter_is_exact() {
        let config = RetryConfig::new(4)
            .with_initial_delay(Duration::from_millis(10))
            .with_jitter(false);
        assert_eq!(config.delay_for_attempt(1), Duration::from_millis(10));
        assert_eq!(config.delay_for_attempt(3), Duration::from_millis(40));
    }

    #[test]
    fn retry_delay_respects_max() {
        let config = RetryConfig::new(10)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(5))
            .with_backoff_multiplier(10.0);

        let delay = config.delay_for_attempt(5);
        assert!(delay <= Duration::from_millis(6250));
    }

    #[test]
    fn immediate_retry_never_waits() {
        let config = RetryConfig::immediate(3);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.delay_for_attempt(2), Duration::ZERO);
    }
}
