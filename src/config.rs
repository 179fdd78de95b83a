use std::time::Duration;

use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use bon::Builder;

pub(crate) const DEFAULT_HEARTBEAT_INTERVAL: Duration = Duration::from_secs(20);
pub(crate) const DEFAULT_INITIAL_BACKOFF: Duration = Duration::from_millis(500);
pub(crate) const DEFAULT_MAX_BACKOFF: Duration = Duration::from_secs(10);
pub(crate) const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Well-known hub path on the origin.
pub(crate) const DEFAULT_REALTIME_PATH: &str = "/realtime";

/// Configuration for client behavior.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct Config {
    /// Interval between keep-alive pings while the connection is open
    #[builder(default = DEFAULT_HEARTBEAT_INTERVAL)]
    pub heartbeat_interval: Duration,
    /// Hub path appended to the origin when resolving the endpoint
    #[builder(default = DEFAULT_REALTIME_PATH.to_owned())]
    pub path: String,
    /// Reconnection strategy configuration
    #[builder(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            heartbeat_interval: DEFAULT_HEARTBEAT_INTERVAL,
            path: DEFAULT_REALTIME_PATH.to_owned(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for automatic reconnection behavior.
///
/// The client retries forever; there is no attempt cap. A hub that stays
/// unreachable manifests as a client cycling through `connecting`/`closed`
/// at the capped delay, which is the intended policy for a long-lived
/// dashboard link.
#[non_exhaustive]
#[derive(Debug, Clone, Builder)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt
    #[builder(default = DEFAULT_INITIAL_BACKOFF)]
    pub initial_backoff: Duration,
    /// Upper bound on the reconnection delay
    #[builder(default = DEFAULT_MAX_BACKOFF)]
    pub max_backoff: Duration,
    /// Multiplier applied to the delay after each failed attempt
    #[builder(default = DEFAULT_BACKOFF_MULTIPLIER)]
    pub backoff_multiplier: f64,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_backoff: DEFAULT_INITIAL_BACKOFF,
            max_backoff: DEFAULT_MAX_BACKOFF,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
        }
    }
}

impl From<ReconnectConfig> for ExponentialBackoff {
    fn from(config: ReconnectConfig) -> Self {
        ExponentialBackoffBuilder::default()
            .with_initial_interval(config.initial_backoff)
            .with_max_interval(config.max_backoff)
            .with_multiplier(config.backoff_multiplier)
            // No jitter: the delay sequence is deterministic, matching the
            // hub's reference client.
            .with_randomization_factor(0.0)
            .with_max_elapsed_time(None) // Retry forever
            .build()
    }
}
