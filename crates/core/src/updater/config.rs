//! Updater retry configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the `[updater]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpdaterConfig {
    /// Maximum calls to the ticketing client per update.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    /// Timeout for a single call in milliseconds.
    #[serde(default = "default_per_call_timeout_ms")]
    pub per_call_timeout_ms: u64,
    /// Delay after the first failed call in milliseconds.
    #[serde(default = "default_initial_backoff_ms")]
    pub initial_backoff_ms: u64,
    /// Exponential backoff multiplier.
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,
    /// Upper bound for a single backoff in milliseconds.
    #[serde(default = "default_max_backoff_ms")]
    pub max_backoff_ms: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_per_call_timeout_ms() -> u64 {
    10_000
}

fn default_initial_backoff_ms() -> u64 {
    500
}

fn default_backoff_multiplier() -> f64 {
    2.0
}

fn default_max_backoff_ms() -> u64 {
    5_000
}

impl Default for UpdaterConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            per_call_timeout_ms: default_per_call_timeout_ms(),
            initial_backoff_ms: default_initial_backoff_ms(),
            backoff_multiplier: default_backoff_multiplier(),
            max_backoff_ms: default_max_backoff_ms(),
        }
    }
}

impl UpdaterConfig {
    pub fn per_call_timeout(&self) -> Duration {
        Duration::from_millis(self.per_call_timeout_ms)
    }

    /// Backoff after the given failed attempt (1-indexed).
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let delay = self.initial_backoff_ms as f64 * self.backoff_multiplier.powi(exponent);
        Duration::from_millis(delay.min(self.max_backoff_ms as f64) as u64)
    }

    /// Upper bound on wall-clock time for one update: every attempt hitting
    /// its timeout plus every backoff between them.
    pub fn worst_case_duration(&self) -> Duration {
        let calls = self.per_call_timeout() * self.max_attempts;
        let backoffs: Duration = (1..self.max_attempts).map(|a| self.backoff_for(a)).sum();
        calls + backoffs
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("max_attempts must be at least 1".to_string());
        }
        if self.per_call_timeout_ms == 0 {
            return Err("per_call_timeout_ms must be greater than 0".to_string());
        }
        if self.backoff_multiplier < 1.0 {
            return Err(format!(
                "backoff_multiplier must be >= 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        if self.max_backoff_ms < self.initial_backoff_ms {
            return Err("max_backoff_ms must be >= initial_backoff_ms".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = UpdaterConfig::default();
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.backoff_multiplier, 2.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_backoff_is_exponential_and_capped() {
        let config = UpdaterConfig {
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 350,
            ..Default::default()
        };
        assert_eq!(config.backoff_for(1), Duration::from_millis(100));
        assert_eq!(config.backoff_for(2), Duration::from_millis(200));
        assert_eq!(config.backoff_for(3), Duration::from_millis(350));
    }

    #[test]
    fn test_worst_case_duration() {
        let config = UpdaterConfig {
            max_attempts: 3,
            per_call_timeout_ms: 1_000,
            initial_backoff_ms: 100,
            backoff_multiplier: 2.0,
            max_backoff_ms: 1_000,
        };
        assert_eq!(config.worst_case_duration(), Duration::from_millis(3_300));
    }

    #[test]
    fn test_zero_attempts_invalid() {
        let config = UpdaterConfig {
            max_attempts: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
