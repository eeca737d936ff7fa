//! Backoff between step attempts.
//!
//! The default schedule waits `base * 2^attempt` after the failed attempt
//! numbered `attempt` (counted from 0), with a one-second base.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// How the wait grows from one attempt to the next, in base-delay units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffStrategy {
    /// 1, 2, 4, 8, ...
    #[default]
    Exponential,
    /// 1, 2, 3, 4, ...
    Linear,
    /// 1, 1, 1, ...
    Constant,
}

/// Randomization applied on top of the backoff delay.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JitterStrategy {
    /// Wait exactly the computed delay.
    #[default]
    None,
    /// Anywhere in `0..=delay`.
    Full,
    /// `delay / 2` plus up to another half.
    Equal,
}

/// Delay schedule shared by every step run through an executor.
///
/// How many attempts a step gets is a property of the step itself; this only
/// decides how long to wait between them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Length of one backoff time unit in milliseconds.
    pub base_delay_ms: u64,
    /// Maximum delay cap in milliseconds.
    pub max_delay_ms: u64,
    /// Backoff strategy.
    pub backoff: BackoffStrategy,
    /// Jitter strategy.
    pub jitter: JitterStrategy,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            base_delay_ms: 1000,
            max_delay_ms: 300_000,
            backoff: BackoffStrategy::Exponential,
            jitter: JitterStrategy::None,
        }
    }
}

impl RetryConfig {
    /// Creates a config with the default schedule.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the base delay.
    #[must_use]
    pub fn with_base_delay_ms(mut self, delay: u64) -> Self {
        self.base_delay_ms = delay;
        self
    }

    /// Sets the maximum delay.
    #[must_use]
    pub fn with_max_delay_ms(mut self, delay: u64) -> Self {
        self.max_delay_ms = delay;
        self
    }

    /// Sets the backoff strategy.
    #[must_use]
    pub fn with_backoff(mut self, strategy: BackoffStrategy) -> Self {
        self.backoff = strategy;
        self
    }

    /// Sets the jitter strategy.
    #[must_use]
    pub fn with_jitter(mut self, strategy: JitterStrategy) -> Self {
        self.jitter = strategy;
        self
    }

    /// Returns the wait after the failed attempt numbered `attempt` (from 0).
    #[must_use]
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let capped = self.backoff_ms(attempt).min(self.max_delay_ms);
        Duration::from_millis(self.jitter.apply(capped))
    }

    fn backoff_ms(&self, attempt: u32) -> u64 {
        let units = match self.backoff {
            BackoffStrategy::Exponential => 2u64.saturating_pow(attempt),
            BackoffStrategy::Linear => u64::from(attempt) + 1,
            BackoffStrategy::Constant => 1,
        };
        self.base_delay_ms.saturating_mul(units)
    }
}

impl JitterStrategy {
    fn apply(self, delay_ms: u64) -> u64 {
        let mut rng = rand::thread_rng();
        match self {
            Self::None => delay_ms,
            Self::Full if delay_ms > 0 => rng.gen_range(0..=delay_ms),
            Self::Equal if delay_ms > 1 => {
                let half = delay_ms / 2;
                half + rng.gen_range(0..=half)
            }
            Self::Full | Self::Equal => delay_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_schedule_doubles_seconds() {
        let config = RetryConfig::default();
        assert_eq!(config.delay_for_attempt(0), Duration::from_secs(1));
        assert_eq!(config.delay_for_attempt(1), Duration::from_secs(2));
        assert_eq!(config.delay_for_attempt(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_is_capped() {
        let config = RetryConfig::new().with_max_delay_ms(5000);
        assert_eq!(config.delay_for_attempt(10), Duration::from_millis(5000));
        assert_eq!(config.delay_for_attempt(u32::MAX), Duration::from_millis(5000));
    }

    #[test]
    fn test_linear_and_constant() {
        let linear = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Linear);
        assert_eq!(linear.delay_for_attempt(0), Duration::from_millis(100));
        assert_eq!(linear.delay_for_attempt(2), Duration::from_millis(300));

        let constant = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_backoff(BackoffStrategy::Constant);
        assert_eq!(constant.delay_for_attempt(5), Duration::from_millis(100));
    }

    #[test]
    fn test_full_jitter_stays_in_range() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::Full);
        for _ in 0..20 {
            assert!(config.delay_for_attempt(1) <= Duration::from_millis(200));
        }
    }

    #[test]
    fn test_equal_jitter_keeps_half() {
        let config = RetryConfig::new()
            .with_base_delay_ms(100)
            .with_jitter(JitterStrategy::Equal);
        for _ in 0..20 {
            let delay = config.delay_for_attempt(0);
            assert!(delay >= Duration::from_millis(50));
            assert!(delay <= Duration::from_millis(100));
        }
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: RetryConfig = serde_json::from_str(r#"{"base_delay_ms": 10}"#).unwrap();
        assert_eq!(config.base_delay_ms, 10);
        assert_eq!(config.max_delay_ms, 300_000);
        assert_eq!(config.jitter, JitterStrategy::None);
    }
}
