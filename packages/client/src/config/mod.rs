//! Configuration surface
//!
//! Plain value structs handed in by an outer builder. Each section validates
//! itself; `ClientConfig` aggregates them.

use serde::{Deserialize, Serialize};

pub mod dns;
pub mod keepalive;
pub mod redirect;
pub mod validation;

pub use dns::{AddressFamilies, CacheStrategy, DnsConfig};
pub use keepalive::KeepAliveConfig;
pub use redirect::RedirectConfig;
pub use validation::{ConfigDefaults, ConfigResult, ConfigValidator, ConfigurationError, Validator};

/// Client core configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub dns: DnsConfig,
    pub keep_alive: KeepAliveConfig,
    pub redirect: RedirectConfig,
}

impl ClientConfig {
    #[must_use]
    pub fn with_dns(mut self, dns: DnsConfig) -> Self {
        self.dns = dns;
        self
    }

    #[must_use]
    pub fn with_keep_alive(mut self, keep_alive: KeepAliveConfig) -> Self {
        self.keep_alive = keep_alive;
        self
    }

    #[must_use]
    pub fn with_redirect(mut self, redirect: RedirectConfig) -> Self {
        self.redirect = redirect;
        self
    }
}

impl Validator for ClientConfig {
    fn validate(&self) -> ConfigResult<()> {
        self.dns.validate()?;
        self.keep_alive.validate()?;
        self.redirect.validate()
    }
}
