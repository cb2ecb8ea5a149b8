//! Agent configuration.

use std::time::Duration;

/// Default time between two ticks, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: f64 = 1.0;

/// Error type for invalid configuration values.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Poll interval is not a positive, finite number of seconds.
    InvalidInterval(f64),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidInterval(secs) => {
                write!(f, "poll interval must be a positive number of seconds, got {}", secs)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// What to monitor and how often. Immutable once built.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AgentConfig {
    target_pid: u32,
    poll_interval: Duration,
}

impl AgentConfig {
    /// Builds a configuration.
    ///
    /// # Arguments
    /// * `target_pid` - Root of the monitored process tree. `None` (or `0`)
    ///   selects the current process.
    /// * `poll_interval_secs` - Seconds between ticks, must be > 0.
    pub fn new(target_pid: Option<u32>, poll_interval_secs: f64) -> Result<Self, ConfigError> {
        if !(poll_interval_secs > 0.0) {
            return Err(ConfigError::InvalidInterval(poll_interval_secs));
        }
        let poll_interval = Duration::try_from_secs_f64(poll_interval_secs)
            .map_err(|_| ConfigError::InvalidInterval(poll_interval_secs))?;
        if poll_interval.is_zero() {
            return Err(ConfigError::InvalidInterval(poll_interval_secs));
        }

        let target_pid = match target_pid {
            Some(pid) if pid != 0 => pid,
            _ => std::process::id(),
        };

        Ok(Self {
            target_pid,
            poll_interval,
        })
    }

    /// PID of the root of the monitored process tree.
    pub fn target_pid(&self) -> u32 {
        self.target_pid
    }

    /// Time between two ticks.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            target_pid: std::process::id(),
            poll_interval: Duration::from_secs_f64(DEFAULT_POLL_INTERVAL_SECS),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_targets_current_process() {
        let config = AgentConfig::default();
        assert_eq!(config.target_pid(), std::process::id());
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
    }

    #[test]
    fn test_explicit_pid_and_fractional_interval() {
        let config = AgentConfig::new(Some(4242), 0.25).unwrap();
        assert_eq!(config.target_pid(), 4242);
        assert_eq!(config.poll_interval(), Duration::from_millis(250));
    }

    #[test]
    fn test_missing_or_zero_pid_means_self() {
        assert_eq!(
            AgentConfig::new(None, 1.0).unwrap().target_pid(),
            std::process::id()
        );
        assert_eq!(
            AgentConfig::new(Some(0), 1.0).unwrap().target_pid(),
            std::process::id()
        );
    }

    #[test]
    fn test_rejects_bad_intervals() {
        for secs in [0.0, -1.0, f64::NAN, f64::INFINITY, 1e-12] {
            assert!(
                AgentConfig::new(None, secs).is_err(),
                "interval {} should be rejected",
                secs
            );
        }
    }
}
