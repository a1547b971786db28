//! DNS resolver with UDP primary and TCP fallback
//!
//! Every server is asked over the primary transport first. A truncated
//! answer, or a primary transport that fails outright, makes the resolver ask
//! the same server again over the fallback transport and use only that
//! answer. A server that stays silent is skipped without a fallback attempt.
//!
//! Hosts file entries win over any query. Relative names are expanded with
//! the configured search domains, `resolv.conf` style.

use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;
use std::time::Duration;

use hashbrown::HashSet;
use tokio::time::Instant;
use tracing::{debug, warn};

use super::cache::{self, AddressCache, CacheEntry, CachedAnswer};
use super::error::ResolverError;
use super::hosts::HostsFile;
use super::question::{DnsQuestion, DnsRecord, DnsResponse, ResponseCode};
use super::transport::{DnsTransport, TcpTransport, UdpTransport};
use crate::config::{AddressFamilies, DnsConfig, Validator};

/// A successful resolution.
#[derive(Debug, Clone)]
pub struct Resolved {
    pub records: Arc<[DnsRecord]>,
    /// Remaining lifetime of the answer, zero when it was not cacheable.
    pub ttl: Duration,
    /// The answer's TTL was below the configured floor.
    pub provisional: bool,
}

/// Asynchronous, cache-backed DNS resolver
#[derive(Debug, Clone)]
pub struct DnsResolver {
    config: Arc<DnsConfig>,
    cache: Arc<dyn AddressCache>,
    hosts: Arc<HostsFile>,
    primary: Arc<dyn DnsTransport>,
    fallback: Arc<dyn DnsTransport>,
}

/// Queries left for one lookup; `None` is unlimited.
struct QueryAllowance {
    remaining: Option<u32>,
    limit: u32,
}

impl QueryAllowance {
    fn new(config: &DnsConfig) -> Self {
        let limit = config.max_queries_per_resolve.map(|per_server| {
            let servers = u32::try_from(config.servers.len()).unwrap_or(u32::MAX);
            per_server.saturating_mul(servers.max(1))
        });
        Self {
            remaining: limit,
            limit: limit.unwrap_or(u32::MAX),
        }
    }

    fn take(&mut self, name: &str) -> Result<(), ResolverError> {
        match &mut self.remaining {
            None => Ok(()),
            Some(0) => Err(ResolverError::QueryLimitExceeded {
                name: name.to_owned(),
                limit: self.limit,
            }),
            Some(n) => {
                *n -= 1;
                Ok(())
            }
        }
    }
}

impl DnsResolver {
    /// Resolver speaking UDP with TCP fallback, caching per `config.cache`.
    ///
    /// # Errors
    ///
    /// A `Builder` error when the configuration is invalid or its hosts file
    /// cannot be read.
    pub fn new(config: DnsConfig) -> crate::Result<Self> {
        Self::with_transports(config, Arc::new(UdpTransport), Arc::new(TcpTransport))
    }

    /// Resolver over custom primary and fallback transports.
    ///
    /// # Errors
    ///
    /// Same as [`new`](Self::new).
    pub fn with_transports(
        config: DnsConfig,
        primary: Arc<dyn DnsTransport>,
        fallback: Arc<dyn DnsTransport>,
    ) -> crate::Result<Self> {
        config.validate()?;
        let hosts = match &config.hosts_file {
            Some(path) => HostsFile::load(path).map_err(crate::error::builder)?,
            None => HostsFile::default(),
        };
        let cache = cache::from_strategy(config.cache);
        Ok(Self {
            config: Arc::new(config),
            cache,
            hosts: Arc::new(hosts),
            primary,
            fallback,
        })
    }

    /// Share an existing cache, e.g. across resolvers.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn AddressCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Replaces the hosts entries loaded from `config.hosts_file`.
    #[must_use]
    pub fn with_hosts(mut self, hosts: HostsFile) -> Self {
        self.hosts = Arc::new(hosts);
        self
    }

    pub fn config(&self) -> &DnsConfig {
        &self.config
    }

    pub fn cache(&self) -> &Arc<dyn AddressCache> {
        &self.cache
    }

    /// Resolves a question into its record set.
    ///
    /// # Errors
    ///
    /// `ResolutionTimeout` when no server answered in time, `NameNotFound` on
    /// an authoritative negative answer, `Resolution` otherwise.
    pub async fn resolve(&self, question: &DnsQuestion) -> crate::Result<Arc<[DnsRecord]>> {
        Ok(self.lookup(question).await?.records)
    }

    /// Like [`resolve`](Self::resolve), also reporting the answer's lifetime.
    ///
    /// # Errors
    ///
    /// Same as [`resolve`](Self::resolve). Running past
    /// `config.resolve_timeout` is a `ResolutionTimeout`.
    pub async fn lookup(&self, question: &DnsQuestion) -> crate::Result<Resolved> {
        match self.config.resolve_timeout {
            Some(limit) => tokio::time::timeout(limit, self.lookup_candidates(question))
                .await
                .map_err(|_| {
                    debug!("resolving {} took longer than {:?}", question, limit);
                    crate::error::resolution_timeout(question.name())
                })?,
            None => self.lookup_candidates(question).await,
        }
    }

    /// Addresses of `host` over `families`, deduplicated in answer order, with
    /// the shortest TTL among the families that contributed.
    ///
    /// One family failing is tolerated as long as another one answers. An
    /// empty list means every family answered without addresses.
    ///
    /// # Errors
    ///
    /// The last lookup error when no family produced an address.
    pub async fn lookup_addresses(
        &self,
        host: &str,
        families: AddressFamilies,
    ) -> crate::Result<(Vec<IpAddr>, Duration)> {
        let mut addrs = Vec::new();
        let mut seen = HashSet::new();
        let mut ttl: Option<Duration> = None;
        let mut last_error = None;

        for &kind in families.record_kinds() {
            let resolved = match self.lookup(&DnsQuestion::new(host, kind)).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    last_error = Some(e);
                    continue;
                }
            };

            let before = addrs.len();
            addrs.extend(
                resolved
                    .records
                    .iter()
                    .filter_map(DnsRecord::ip)
                    .filter(|ip| seen.insert(*ip)),
            );
            if addrs.len() > before {
                ttl = Some(ttl.map_or(resolved.ttl, |t| t.min(resolved.ttl)));
            }
        }

        match (addrs.is_empty(), last_error) {
            (true, Some(e)) => Err(e),
            _ => Ok((addrs, ttl.unwrap_or_default())),
        }
    }

    async fn lookup_candidates(&self, question: &DnsQuestion) -> crate::Result<Resolved> {
        if let Some(ip) = question.ip_literal() {
            return Ok(self.fixed(question, std::iter::once(ip)));
        }

        let hosts = self.hosts.lookup(question.name(), question.kind());
        if !hosts.is_empty() {
            debug!("{} answered from the hosts file", question);
            return Ok(self.fixed(question, hosts));
        }

        let mut allowance = QueryAllowance::new(&self.config);
        let mut empty = None;
        let mut not_found = None;
        for candidate in self.search_candidates(question) {
            match self.lookup_one(&candidate, &mut allowance).await {
                Ok(resolved) if resolved.records.is_empty() => {
                    empty.get_or_insert(resolved);
                }
                Ok(resolved) => return Ok(resolved),
                Err(e) if e.is_name_not_found() => not_found = Some(e),
                Err(e) => return Err(e),
            }
        }

        match (empty, not_found) {
            (Some(resolved), _) => Ok(resolved),
            (None, Some(e)) => Err(e),
            (None, None) => Err(crate::error::name_not_found(question.name())),
        }
    }

    /// Names to try in order: as is first when the name carries at least
    /// `ndots` dots, after every search domain otherwise.
    fn search_candidates(&self, question: &DnsQuestion) -> Vec<DnsQuestion> {
        let name = question.name();
        if self.config.search_domains.is_empty() {
            return vec![question.clone()];
        }

        let expanded = self.config.search_domains.iter().map(|domain| {
            DnsQuestion::new(
                format!("{}.{}", name, domain.trim_matches('.')),
                question.kind(),
            )
        });
        if name.matches('.').count() >= self.config.ndots {
            std::iter::once(question.clone()).chain(expanded).collect()
        } else {
            expanded.chain(std::iter::once(question.clone())).collect()
        }
    }

    fn fixed(&self, question: &DnsQuestion, ips: impl IntoIterator<Item = IpAddr>) -> Resolved {
        let ttl = self.config.max_ttl;
        let records: Vec<DnsRecord> = ips
            .into_iter()
            .map(|ip| DnsRecord::addr(question.name(), ip, ttl))
            .filter(|r| r.kind == question.kind())
            .collect();
        Resolved {
            records: records.into(),
            ttl,
            provisional: false,
        }
    }

    async fn lookup_one(
        &self,
        question: &DnsQuestion,
        allowance: &mut QueryAllowance,
    ) -> crate::Result<Resolved> {
        if let Some(entry) = self.cache.get(question) {
            return match &entry.answer {
                CachedAnswer::Records(records) => Ok(Resolved {
                    records: Arc::clone(records),
                    ttl: entry.expires_at().saturating_duration_since(Instant::now()),
                    provisional: entry.is_provisional(),
                }),
                CachedAnswer::NameNotFound => {
                    Err(crate::error::name_not_found(question.name()))
                }
            };
        }

        let response = match self.query_servers(question, allowance).await {
            Ok(response) => response,
            Err(ResolverError::NameNotFound { name }) => {
                if !self.config.negative_ttl.is_zero() {
                    self.cache.put(
                        question.clone(),
                        CacheEntry::new(CachedAnswer::NameNotFound, self.config.negative_ttl, false),
                    );
                }
                return Err(crate::error::name_not_found(&name));
            }
            Err(e) => return Err(e.into()),
        };

        let records: Arc<[DnsRecord]> = response.records.into();
        let Some(min_ttl) = records.iter().map(|r| r.ttl).min() else {
            debug!("empty answer for {}, not caching", question);
            return Ok(Resolved {
                records,
                ttl: Duration::ZERO,
                provisional: false,
            });
        };

        let ttl = min_ttl.min(self.config.max_ttl);
        let provisional = ttl < self.config.min_ttl;
        self.cache.put(
            question.clone(),
            CacheEntry::new(CachedAnswer::Records(Arc::clone(&records)), ttl, provisional),
        );
        debug!(
            "resolved {} to {} records, ttl {:?}{}",
            question,
            records.len(),
            ttl,
            if provisional { " (provisional)" } else { "" }
        );

        Ok(Resolved {
            records,
            ttl,
            provisional,
        })
    }

    async fn query_servers(
        &self,
        question: &DnsQuestion,
        allowance: &mut QueryAllowance,
    ) -> Result<DnsResponse, ResolverError> {
        if self.config.servers.is_empty() {
            return Err(ResolverError::NoServers);
        }

        let mut last_error = None;
        for &server in &self.config.servers {
            let response = match self.exchange(server, question, allowance).await {
                Ok(response) => response,
                Err(e @ ResolverError::QueryLimitExceeded { .. }) => {
                    warn!("{}", e);
                    return Err(e);
                }
                Err(ResolverError::Timeout { server }) => {
                    debug!("DNS server {} timed out for {}", server, question);
                    continue;
                }
                Err(e) => {
                    warn!("DNS server {} failed for {}: {}", server, question, e);
                    last_error = Some(e);
                    continue;
                }
            };

            match response.code {
                ResponseCode::NoError => return Ok(response),
                ResponseCode::NxDomain => {
                    return Err(ResolverError::NameNotFound {
                        name: question.name().to_owned(),
                    });
                }
                code => {
                    warn!("DNS server {} answered {:?} for {}", server, code, question);
                    last_error = Some(ResolverError::ServerFailure { server, code });
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ResolverError::AllServersTimedOut {
            name: question.name().to_owned(),
        }))
    }

    /// Every attempt, fallback included, spends one query of the allowance.
    async fn exchange(
        &self,
        server: SocketAddr,
        question: &DnsQuestion,
        allowance: &mut QueryAllowance,
    ) -> Result<DnsResponse, ResolverError> {
        allowance.take(question.name())?;
        let timeout = self.config.query_timeout;
        match tokio::time::timeout(timeout, self.primary.exchange(server, question)).await {
            Err(_) => Err(ResolverError::Timeout { server }),
            Ok(Ok(response)) if !response.truncated => Ok(response),
            Ok(Ok(_)) => {
                debug!("truncated response received, retrying over TCP");
                allowance.take(question.name())?;
                self.exchange_fallback(server, question).await
            }
            Ok(Err(e)) if e.is_transport_failure() => {
                debug!("primary transport failed ({}), retrying over TCP", e);
                allowance.take(question.name())?;
                self.exchange_fallback(server, question).await
            }
            Ok(Err(e)) => Err(e),
        }
    }

    /// The fallback answer is final, even when it is itself truncated.
    async fn exchange_fallback(
        &self,
        server: SocketAddr,
        question: &DnsQuestion,
    ) -> Result<DnsResponse, ResolverError> {
        tokio::time::timeout(self.config.query_timeout, self.fallback.exchange(server, question))
            .await
            .map_err(|_| ResolverError::Timeout { server })?
    }
}
