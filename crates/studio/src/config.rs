//! Studio configuration.

use std::time::Duration;

use easel_backend::reconnect::ReconnectConfig;
use easel_core::results::DEFAULT_RESULT_CAPACITY;

/// Default backend base URL for local development.
pub const DEFAULT_BASE_URL: &str = "http://localhost:7860";
/// Default fallback-poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;

/// Configuration for one controller instance.
#[derive(Debug, Clone)]
pub struct StudioConfig {
    /// HTTP base URL of the generation backend.
    pub base_url: String,
    /// Bound on the retained result history.
    pub results_capacity: usize,
    /// Fixed interval of the fallback status poller.
    pub poll_interval: Duration,
    /// Live-channel backoff tuning.
    pub reconnect: ReconnectConfig,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            results_capacity: DEFAULT_RESULT_CAPACITY,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            reconnect: ReconnectConfig::default(),
        }
    }
}

impl StudioConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                 |
    /// |----------------------------|-------------------------|
    /// | `EASEL_BASE_URL`           | `http://localhost:7860` |
    /// | `EASEL_RESULTS_CAPACITY`   | `20`                    |
    /// | `EASEL_POLL_INTERVAL_SECS` | `10`                    |
    pub fn from_env() -> Self {
        let base_url =
            std::env::var("EASEL_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());

        let results_capacity: usize = std::env::var("EASEL_RESULTS_CAPACITY")
            .unwrap_or_else(|_| DEFAULT_RESULT_CAPACITY.to_string())
            .parse()
            .expect("EASEL_RESULTS_CAPACITY must be a valid usize");

        let poll_interval_secs: u64 = std::env::var("EASEL_POLL_INTERVAL_SECS")
            .unwrap_or_else(|_| DEFAULT_POLL_INTERVAL_SECS.to_string())
            .parse()
            .expect("EASEL_POLL_INTERVAL_SECS must be a valid u64");

        Self {
            base_url,
            results_capacity,
            poll_interval: Duration::from_secs(poll_interval_secs),
            reconnect: ReconnectConfig::default(),
        }
    }
}
