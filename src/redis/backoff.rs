//! Reconnect delays for the event subscriber

use std::time::Duration;

use rand::Rng;

use crate::config::RedisConfig;

/// Delay schedule: `initial * 2^attempt`, capped, with +/- jitter
#[derive(Debug, Clone)]
pub struct BackoffConfig {
    pub initial: Duration,
    pub max: Duration,
    /// Fraction of the delay used as jitter, 0.0 disables it
    pub jitter: f64,
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::from(&RedisConfig::default())
    }
}

impl From<&RedisConfig> for BackoffConfig {
    fn from(config: &RedisConfig) -> Self {
        Self {
            initial: Duration::from_millis(config.reconnect_initial_ms.max(1)),
            max: Duration::from_millis(config.reconnect_max_ms.max(config.reconnect_initial_ms)),
            jitter: 0.1,
        }
    }
}

/// Tracks consecutive failed subscription attempts
#[derive(Debug)]
pub struct ExponentialBackoff {
    config: BackoffConfig,
    attempt: u32,
}

impl ExponentialBackoff {
    pub fn with_config(config: BackoffConfig) -> Self {
        Self { config, attempt: 0 }
    }

    /// Undithered delay for the given attempt number
    fn base_delay(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.min(16));
        self.config
            .initial
            .saturating_mul(factor)
            .min(self.config.max)
    }

    /// Delay before the next attempt; advances the attempt counter
    pub fn next_delay(&mut self) -> Duration {
        let base = self.base_delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);

        if self.config.jitter <= 0.0 {
            return base;
        }
        let spread = base.as_secs_f64() * self.config.jitter;
        let offset = rand::rng().random_range(-spread..=spread);
        Duration::from_secs_f64((base.as_secs_f64() + offset).max(0.001))
    }

    /// Called once a subscription is established
    pub fn reset(&mut self) {
        self.attempt = 0;
    }

    pub fn attempt(&self) -> u32 {
        self.attempt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schedule(initial_ms: u64, max_ms: u64) -> ExponentialBackoff {
        ExponentialBackoff::with_config(BackoffConfig {
            initial: Duration::from_millis(initial_ms),
            max: Duration::from_millis(max_ms),
            jitter: 0.0,
        })
    }

    #[test]
    fn test_delays_double_until_capped() {
        let mut backoff = schedule(100, 500);
        let delays: Vec<u128> = (0..5).map(|_| backoff.next_delay().as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 500, 500]);
        assert_eq!(backoff.attempt(), 5);
    }

    #[test]
    fn test_reset_restarts_schedule() {
        let mut backoff = schedule(100, 10_000);
        backoff.next_delay();
        backoff.next_delay();

        backoff.reset();
        assert_eq!(backoff.attempt(), 0);
        assert_eq!(backoff.next_delay(), Duration::from_millis(100));
    }

    #[test]
    fn test_many_attempts_do_not_overflow() {
        let mut backoff = schedule(1000, 30_000);
        for _ in 0..100 {
            assert!(backoff.next_delay() <= Duration::from_secs(30));
        }
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let mut backoff = ExponentialBackoff::with_config(BackoffConfig {
            initial: Duration::from_millis(1000),
            max: Duration::from_millis(1000),
            jitter: 0.1,
        });
        for _ in 0..20 {
            let delay = backoff.next_delay().as_millis();
            assert!((899..=1101).contains(&delay));
        }
    }

    #[test]
    fn test_from_redis_config() {
        let config = RedisConfig {
            reconnect_initial_ms: 250,
            reconnect_max_ms: 100,
            ..RedisConfig::default()
        };
        let backoff = BackoffConfig::from(&config);
        assert_eq!(backoff.initial, Duration::from_millis(250));
        // Max never falls below the initial delay
        assert_eq!(backoff.max, Duration::from_millis(250));
    }
}
