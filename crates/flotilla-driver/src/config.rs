//! Driver configuration.

use std::net::IpAddr;
use std::time::Duration;

use serde::Deserialize;

/// Tunable settings for a [`SchedulerDriver`](crate::SchedulerDriver).
#[derive(Debug, Clone, Deserialize)]
pub struct DriverConfig {
    /// TCP connect timeout for master calls, in seconds.
    #[serde(default = "DriverConfig::default_connect_timeout")]
    pub connect_timeout_seconds: u64,

    /// Total timeout for a single master call, in seconds.
    #[serde(default = "DriverConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,

    /// Address the event listener binds; discovered when unset.
    #[serde(default)]
    pub listen_ip: Option<IpAddr>,

    /// Capacity of the inbound event queue.
    #[serde(default = "DriverConfig::default_queue_capacity")]
    pub event_queue_capacity: usize,
}

impl DriverConfig {
    const fn default_connect_timeout() -> u64 {
        10
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    const fn default_queue_capacity() -> usize {
        10
    }

    /// Connect timeout as a [`Duration`].
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    /// Request timeout as a [`Duration`].
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            connect_timeout_seconds: Self::default_connect_timeout(),
            request_timeout_seconds: Self::default_request_timeout(),
            listen_ip: None,
            event_queue_capacity: Self::default_queue_capacity(),
        }
    }
}
