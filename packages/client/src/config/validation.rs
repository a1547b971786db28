//! Configuration validation utilities
//!
//! Common checks shared by the DNS, keep-alive and redirect configurations.

use std::time::Duration;

/// Configuration validation result type
pub type ConfigResult<T> = Result<T, ConfigurationError>;

/// Configuration error types
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigurationError {
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),

    #[error("Invalid network address: {0}")]
    InvalidAddress(String),

    #[error("Invalid configuration parameter: {0}")]
    InvalidParameter(String),

    #[error("Configuration conflict: {0}")]
    Conflict(String),
}

impl From<ConfigurationError> for crate::Error {
    fn from(err: ConfigurationError) -> Self {
        crate::error::builder(err)
    }
}

/// Configuration validation trait
pub trait Validator {
    /// Validates the configuration settings
    ///
    /// # Errors
    ///
    /// Returns a `ConfigurationError` variant describing the first invalid
    /// setting found.
    fn validate(&self) -> ConfigResult<()>;
}

/// Common configuration validation utilities
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate timeout duration
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTimeout` if:
    /// - The timeout duration is zero
    /// - The timeout duration exceeds 1 hour (3600 seconds)
    pub fn validate_timeout(timeout: Duration, name: &str) -> ConfigResult<()> {
        if timeout.is_zero() {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot be zero"
            )));
        }

        if timeout.as_secs() > 3600 {
            return Err(ConfigurationError::InvalidTimeout(format!(
                "{name} cannot exceed 1 hour"
            )));
        }

        Ok(())
    }

    /// Validate an optional interval; `None` means the feature is disabled.
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidTimeout` for a zero interval.
    pub fn validate_optional_interval(interval: Option<Duration>, name: &str) -> ConfigResult<()> {
        match interval {
            Some(interval) if interval.is_zero() => Err(ConfigurationError::InvalidTimeout(
                format!("{name} cannot be zero, use None to disable it"),
            )),
            _ => Ok(()),
        }
    }

    /// Validate numeric range
    ///
    /// # Errors
    ///
    /// Returns `ConfigurationError::InvalidParameter` if the value is outside
    /// the specified range [min, max] (inclusive).
    pub fn validate_range<T>(value: T, min: T, max: T, name: &str) -> ConfigResult<()>
    where
        T: PartialOrd + std::fmt::Display + Copy,
    {
        if value < min || value > max {
            return Err(ConfigurationError::InvalidParameter(format!(
                "{name} must be between {min} and {max}, got {value}"
            )));
        }

        Ok(())
    }
}

/// Common configuration defaults
pub struct ConfigDefaults;

impl ConfigDefaults {
    pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);
    pub const DEFAULT_MIN_TTL: Duration = Duration::from_secs(1);
    /// One day, the same ceiling hickory applies to positive answers.
    pub const DEFAULT_MAX_TTL: Duration = Duration::from_secs(86400);
    pub const DEFAULT_REFRESH_BACKOFF: Duration = Duration::from_secs(1);
    pub const DEFAULT_CACHE_ENTRIES: usize = 1000;
    pub const DEFAULT_MAX_REDIRECTS: usize = 10;
    pub const DEFAULT_DNS_PORT: u16 = 53;
    /// Same default as `resolv.conf`.
    pub const DEFAULT_NDOTS: usize = 1;
}
