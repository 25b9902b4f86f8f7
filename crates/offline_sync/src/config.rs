//! Sync engine configuration

use std::time::Duration;
use store::SyncSettings;

/// Timing knobs for draining, probing and polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    /// Pause between consecutive remote calls in a drain
    pub drain_delay: Duration,
    /// Health probe interval while work is pending or the server is down
    pub health_check_interval: Duration,
    /// Hard timeout for a single health probe
    pub health_check_timeout: Duration,
    /// Background poll interval
    pub poll_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            drain_delay: Duration::from_millis(250),
            health_check_interval: Duration::from_secs(5),
            health_check_timeout: Duration::from_secs(2),
            poll_interval: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    pub fn from_settings(settings: &SyncSettings) -> Self {
        Self {
            drain_delay: Duration::from_millis(settings.drain_delay_ms),
            health_check_interval: Duration::from_secs(settings.health_check_interval_secs.max(1)),
            health_check_timeout: Duration::from_millis(settings.health_check_timeout_ms),
            poll_interval: Duration::from_secs(settings.poll_interval_secs.max(1)),
        }
    }

    pub fn with_drain_delay(mut self, delay: Duration) -> Self {
        self.drain_delay = delay;
        self
    }

    pub fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    pub fn with_health_check_timeout(mut self, timeout: Duration) -> Self {
        self.health_check_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }
}
