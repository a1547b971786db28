//! Keep-alive configuration
//!
//! Ping interval, idle threshold and connection recycling limits consumed by
//! `KeepAliveHandler`.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigResult, ConfigValidator, ConfigurationError, Validator};

/// Per-connection liveness settings. `None` and zero disable a limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeepAliveConfig {
    /// Ping after this much ping inactivity; also the ping-ack bound
    pub ping_interval: Option<Duration>,
    /// Close a connection idle for this long with no requests in progress
    pub idle_timeout: Option<Duration>,
    /// Recycle a connection once it is this old
    pub max_connection_age: Option<Duration>,
    /// Recycle a connection after this many requests
    pub max_requests_per_connection: u64,
}

impl KeepAliveConfig {
    /// Set the ping interval
    ///
    /// Pings are sent once the connection saw no ping activity for the
    /// interval, and an unacknowledged ping closes the connection after
    /// another interval.
    #[must_use]
    pub fn with_ping_interval(mut self, interval: Option<Duration>) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Set the idle threshold
    #[must_use]
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_max_connection_age(mut self, age: Option<Duration>) -> Self {
        self.max_connection_age = age;
        self
    }

    #[must_use]
    pub fn with_max_requests_per_connection(mut self, max: u64) -> Self {
        self.max_requests_per_connection = max;
        self
    }
}

impl Validator for KeepAliveConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_optional_interval(self.ping_interval, "ping_interval")?;
        ConfigValidator::validate_optional_interval(self.idle_timeout, "idle_timeout")?;
        ConfigValidator::validate_optional_interval(
            self.max_connection_age,
            "max_connection_age",
        )?;

        if let (Some(ping), Some(idle)) = (self.ping_interval, self.idle_timeout)
            && ping >= idle
        {
            return Err(ConfigurationError::Conflict(format!(
                "ping_interval {ping:?} must be shorter than idle_timeout {idle:?}"
            )));
        }

        Ok(())
    }
}
