//! DNS resolver configuration
//!
//! Query timeouts, name servers, TTL bounds and the cache strategy consumed by
//! `DnsResolver` and `DnsEndpointGroup`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::validation::{ConfigDefaults, ConfigResult, ConfigValidator, ConfigurationError, Validator};
use crate::dns::RecordKind;

/// Which cache implementation a resolver uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    /// TTL-aware cache bounded to `max_entries`.
    Ttl { max_entries: usize },
    /// Every lookup misses and nothing is stored.
    Disabled,
}

impl Default for CacheStrategy {
    fn default() -> Self {
        CacheStrategy::Ttl {
            max_entries: ConfigDefaults::DEFAULT_CACHE_ENTRIES,
        }
    }
}

/// Address families queried for a host name, in preference order.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressFamilies {
    Ipv4Only,
    Ipv6Only,
    #[default]
    Ipv4AndIpv6,
    Ipv6AndIpv4,
}

impl AddressFamilies {
    /// Record kinds to query, preferred family first.
    #[must_use]
    pub fn record_kinds(self) -> &'static [RecordKind] {
        match self {
            AddressFamilies::Ipv4Only => &[RecordKind::A],
            AddressFamilies::Ipv6Only => &[RecordKind::Aaaa],
            AddressFamilies::Ipv4AndIpv6 => &[RecordKind::A, RecordKind::Aaaa],
            AddressFamilies::Ipv6AndIpv4 => &[RecordKind::Aaaa, RecordKind::A],
        }
    }
}

/// DNS resolution configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DnsConfig {
    /// Name servers, tried in order
    pub servers: Vec<SocketAddr>,
    /// Timeout applied to every single query attempt
    pub query_timeout: Duration,
    /// Bound on a whole lookup, across servers, fallbacks and search domains
    pub resolve_timeout: Option<Duration>,
    /// Queries allowed per lookup and per configured server, `None` for no limit
    pub max_queries_per_resolve: Option<u32>,
    /// Domains appended to names with fewer than `ndots` dots before they are
    /// tried as is
    pub search_domains: Vec<String>,
    /// Dots a name needs before it is tried as is ahead of the search domains
    pub ndots: usize,
    /// Hosts file consulted before any query
    pub hosts_file: Option<PathBuf>,
    /// TTL floor; answers below it are cached as provisional
    pub min_ttl: Duration,
    /// TTL ceiling; longer TTLs are clamped down to it
    pub max_ttl: Duration,
    /// How long a name-not-found answer is cached, zero disables it
    pub negative_ttl: Duration,
    /// Cache implementation
    pub cache: CacheStrategy,
    /// Record kinds queried by DNS-backed endpoint groups
    pub address_families: AddressFamilies,
    /// Delay before a DNS-backed endpoint group retries a failed resolution
    pub refresh_backoff: Duration,
}

impl Default for DnsConfig {
    fn default() -> Self {
        Self {
            servers: vec![SocketAddr::new(
                IpAddr::V4(Ipv4Addr::LOCALHOST),
                ConfigDefaults::DEFAULT_DNS_PORT,
            )],
            query_timeout: ConfigDefaults::DEFAULT_QUERY_TIMEOUT,
            resolve_timeout: None,
            max_queries_per_resolve: None,
            search_domains: Vec::new(),
            ndots: ConfigDefaults::DEFAULT_NDOTS,
            hosts_file: None,
            min_ttl: ConfigDefaults::DEFAULT_MIN_TTL,
            max_ttl: ConfigDefaults::DEFAULT_MAX_TTL,
            negative_ttl: Duration::ZERO,
            cache: CacheStrategy::default(),
            address_families: AddressFamilies::default(),
            refresh_backoff: ConfigDefaults::DEFAULT_REFRESH_BACKOFF,
        }
    }
}

impl DnsConfig {
    /// Replace the name servers
    #[must_use]
    pub fn with_servers(mut self, servers: impl IntoIterator<Item = SocketAddr>) -> Self {
        self.servers = servers.into_iter().collect();
        self
    }

    /// Set the per-attempt query timeout
    #[must_use]
    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    /// Bound a whole lookup, including fallbacks and search domain candidates
    #[must_use]
    pub fn with_resolve_timeout(mut self, timeout: Duration) -> Self {
        self.resolve_timeout = Some(timeout);
        self
    }

    /// Limit queries per lookup; the limit is multiplied by the server count
    #[must_use]
    pub fn with_max_queries_per_resolve(mut self, max_queries: u32) -> Self {
        self.max_queries_per_resolve = Some(max_queries);
        self
    }

    /// Set the search domains and the dot threshold for absolute-first lookups
    #[must_use]
    pub fn with_search_domains<S: Into<String>>(
        mut self,
        domains: impl IntoIterator<Item = S>,
        ndots: usize,
    ) -> Self {
        self.search_domains = domains.into_iter().map(Into::into).collect();
        self.ndots = ndots;
        self
    }

    #[must_use]
    pub fn with_hosts_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.hosts_file = Some(path.into());
        self
    }

    /// Set the TTL floor and ceiling
    #[must_use]
    pub fn with_ttl(mut self, min_ttl: Duration, max_ttl: Duration) -> Self {
        self.min_ttl = min_ttl;
        self.max_ttl = max_ttl;
        self
    }

    /// Cache name-not-found answers for `negative_ttl`
    #[must_use]
    pub fn with_negative_ttl(mut self, negative_ttl: Duration) -> Self {
        self.negative_ttl = negative_ttl;
        self
    }

    #[must_use]
    pub fn with_cache(mut self, cache: CacheStrategy) -> Self {
        self.cache = cache;
        self
    }

    /// Disable answer caching
    #[must_use]
    pub fn without_cache(self) -> Self {
        self.with_cache(CacheStrategy::Disabled)
    }

    #[must_use]
    pub fn with_address_families(mut self, families: AddressFamilies) -> Self {
        self.address_families = families;
        self
    }

    #[must_use]
    pub fn with_refresh_backoff(mut self, backoff: Duration) -> Self {
        self.refresh_backoff = backoff;
        self
    }
}

impl Validator for DnsConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.servers.is_empty() {
            return Err(ConfigurationError::InvalidAddress(
                "at least one DNS server is required".to_string(),
            ));
        }
        if let Some(server) = self.servers.iter().find(|s| s.port() == 0) {
            return Err(ConfigurationError::InvalidAddress(format!(
                "DNS server {server} has port 0"
            )));
        }

        ConfigValidator::validate_timeout(self.query_timeout, "query_timeout")?;
        ConfigValidator::validate_timeout(self.refresh_backoff, "refresh_backoff")?;
        if let Some(timeout) = self.resolve_timeout {
            ConfigValidator::validate_timeout(timeout, "resolve_timeout")?;
        }
        if let Some(max_queries) = self.max_queries_per_resolve {
            ConfigValidator::validate_range(max_queries, 1, u32::MAX, "max_queries_per_resolve")?;
        }
        if let Some(domain) = self
            .search_domains
            .iter()
            .find(|d| d.trim_matches('.').is_empty() || d.contains(char::is_whitespace))
        {
            return Err(ConfigurationError::InvalidParameter(format!(
                "invalid search domain {domain:?}"
            )));
        }

        if self.min_ttl.is_zero() || self.min_ttl > self.max_ttl {
            return Err(ConfigurationError::Conflict(format!(
                "min_ttl: {:?}, max_ttl: {:?} (expected: 0 < min_ttl <= max_ttl)",
                self.min_ttl, self.max_ttl
            )));
        }

        if let CacheStrategy::Ttl { max_entries } = self.cache {
            ConfigValidator::validate_range(max_entries, 1, usize::MAX, "cache.max_entries")?;
        }

        Ok(())
    }
}
