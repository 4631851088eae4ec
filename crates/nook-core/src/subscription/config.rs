//! Subscription monitor configuration

use std::time::Duration;

/// Timing and retry limits for [`SubscriptionMonitor`](super::SubscriptionMonitor)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonitorConfig {
    /// How often staleness is checked (default: 30 seconds)
    pub health_check_interval: Duration,
    /// Silence after which a foregrounded subscription is stale (default: 5 minutes)
    pub stale_threshold: Duration,
    /// Reconnects allowed before giving up (default: 3)
    pub max_reconnect_attempts: u32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            health_check_interval: Duration::from_secs(30),
            stale_threshold: Duration::from_secs(5 * 60),
            max_reconnect_attempts: 3,
        }
    }
}

impl MonitorConfig {
    #[must_use]
    pub const fn with_health_check_interval(mut self, interval: Duration) -> Self {
        self.health_check_interval = interval;
        self
    }

    #[must_use]
    pub const fn with_stale_threshold(mut self, threshold: Duration) -> Self {
        self.stale_threshold = threshold;
        self
    }

    #[must_use]
    pub const fn with_max_reconnect_attempts(mut self, attempts: u32) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_values() {
        let config = MonitorConfig::default();
        assert_eq!(config.health_check_interval, Duration::from_secs(30));
        assert_eq!(config.stale_threshold, Duration::from_secs(300));
        assert_eq!(config.max_reconnect_attempts, 3);
    }

    #[test]
    fn builders_override_single_fields() {
        let config = MonitorConfig::default()
            .with_health_check_interval(Duration::from_secs(5))
            .with_max_reconnect_attempts(1);
        assert_eq!(config.health_check_interval, Duration::from_secs(5));
        assert_eq!(config.stale_threshold, Duration::from_secs(300));
        assert_eq!(config.max_reconnect_attempts, 1);
    }
}
