use std::time::Duration;

use crate::error::ConfigError;

/// Runtime settings of the orchestrator, read once at process start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StarterConfig {
    /// Minutes a stopped node gets before the watchdog force-kills it (default: 1).
    pub shutdown_node_wait_minutes: u64,
    /// Upper bound on concurrently armed watchdogs; `None` means unbounded.
    pub watchdog_limit: Option<usize>,
}

impl Default for StarterConfig {
    fn default() -> Self {
        Self {
            shutdown_node_wait_minutes: 1,
            watchdog_limit: None,
        }
    }
}

impl StarterConfig {
    pub fn with_shutdown_wait_minutes(mut self, minutes: u64) -> Self {
        self.shutdown_node_wait_minutes = minutes;
        self
    }

    pub fn with_watchdog_limit(mut self, limit: usize) -> Self {
        self.watchdog_limit = Some(limit);
        self
    }

    /// Watchdog delay as a [`Duration`].
    pub fn shutdown_node_wait(&self) -> Duration {
        Duration::from_secs(self.shutdown_node_wait_minutes.saturating_mul(60))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.watchdog_limit == Some(0) {
            return Err(ConfigError::InvalidValue {
                key: "watchdog_limit",
                reason: "must be greater than zero".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_one_minute_unbounded() {
        let cfg = StarterConfig::default();
        assert_eq!(cfg.shutdown_node_wait(), Duration::from_secs(60));
        assert!(cfg.watchdog_limit.is_none());
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn minutes_convert_to_duration() {
        let cfg = StarterConfig::default().with_shutdown_wait_minutes(5);
        assert_eq!(cfg.shutdown_node_wait(), Duration::from_secs(300));
    }

    #[test]
    fn zero_watchdog_limit_is_invalid() {
        let cfg = StarterConfig::default().with_watchdog_limit(0);
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidValue {
                key: "watchdog_limit",
                ..
            })
        ));
    }
}
