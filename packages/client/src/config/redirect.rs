//! Redirect configuration

use serde::{Deserialize, Serialize};

use super::validation::{ConfigDefaults, ConfigResult, ConfigValidator, Validator};

/// Redirect following settings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedirectConfig {
    /// Maximum number of hops followed for one request
    pub max_redirects: usize,
    /// Send a `Referer` header on followed redirects
    pub referer: bool,
    /// Refuse to follow redirects to plain-http targets
    pub https_only: bool,
}

impl Default for RedirectConfig {
    fn default() -> Self {
        Self {
            max_redirects: ConfigDefaults::DEFAULT_MAX_REDIRECTS,
            referer: true,
            https_only: false,
        }
    }
}

impl RedirectConfig {
    /// Limit the redirect chain to `max_redirects` hops
    #[must_use]
    pub fn limited(max_redirects: usize) -> Self {
        Self {
            max_redirects,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_referer(mut self, referer: bool) -> Self {
        self.referer = referer;
        self
    }

    #[must_use]
    pub fn with_https_only(mut self, https_only: bool) -> Self {
        self.https_only = https_only;
        self
    }
}

impl Validator for RedirectConfig {
    fn validate(&self) -> ConfigResult<()> {
        ConfigValidator::validate_range(self.max_redirects, 0, 1024, "max_redirects")
    }
}
