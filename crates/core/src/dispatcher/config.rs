//! Dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the `[dispatcher]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Start worker tasks at startup.
    /// When disabled, queued jobs are only processed on demand.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Size of the worker pool. Each worker processes one job at a time.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// How long an idle worker waits before polling the queue again (milliseconds).
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,

    /// Lease on a received job (seconds). An unacknowledged job is redelivered
    /// once its lease expires. Must exceed the orchestrator's hard deadline.
    #[serde(default = "default_lease_secs")]
    pub lease_secs: u64,

    /// Delay before a released job is handed out again (milliseconds).
    #[serde(default = "default_retry_delay")]
    pub retry_delay_ms: u64,
}

fn default_enabled() -> bool {
    true
}

fn default_workers() -> usize {
    4
}

fn default_poll_interval() -> u64 {
    500
}

fn default_lease_secs() -> u64 {
    300
}

fn default_retry_delay() -> u64 {
    5_000
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            workers: default_workers(),
            poll_interval_ms: default_poll_interval(),
            lease_secs: default_lease_secs(),
            retry_delay_ms: default_retry_delay(),
        }
    }
}

impl DispatcherConfig {
    pub fn lease(&self) -> Duration {
        Duration::from_secs(self.lease_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }
}
