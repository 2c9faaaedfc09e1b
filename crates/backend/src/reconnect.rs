//! Exponential-backoff policy for live-channel reconnection.
//!
//! The transport schedules a retry after every failed or dropped
//! connection; [`delay_for_attempt`] computes how long to wait before
//! attempt `n`.  A successful open resets the attempt counter.

use std::time::Duration;

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub base_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows with each further attempt.
    pub multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(8000),
            multiplier: 2.0,
        }
    }
}

/// Backoff delay before reconnect attempt `attempt` (1-based).
///
/// `delay = min(max_delay, base_delay * multiplier^(attempt - 1))`.
pub fn delay_for_attempt(attempt: u32, config: &ReconnectConfig) -> Duration {
    let exponent = attempt.saturating_sub(1).min(32);
    let ms = config.base_delay.as_millis() as f64 * config.multiplier.powi(exponent as i32);
    Duration::from_millis(ms as u64).min(config.max_delay)
}
