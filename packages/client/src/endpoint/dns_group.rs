//! Endpoint group backed by periodic DNS resolution

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::group::{EndpointGroup, GroupState, Publisher};
use super::{DEFAULT_WEIGHT, Endpoint};
use crate::config::AddressFamilies;
use crate::dns::DnsResolver;

/// Builder for [`DnsEndpointGroup`]
#[derive(Debug, Clone)]
pub struct DnsEndpointGroupBuilder {
    host: String,
    port: u16,
    weight: u32,
    address_families: Option<AddressFamilies>,
}

impl DnsEndpointGroupBuilder {
    #[must_use]
    pub fn weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    /// Overrides the resolver configuration's address families.
    #[must_use]
    pub fn address_families(mut self, families: AddressFamilies) -> Self {
        self.address_families = Some(families);
        self
    }

    /// Starts the refresh task. Must be called within a tokio runtime.
    pub fn build(self, resolver: DnsResolver) -> DnsEndpointGroup {
        let publisher = Arc::new(Publisher::new(GroupState::default()));
        let refresher = Refresher {
            families: self
                .address_families
                .unwrap_or(resolver.config().address_families),
            min_ttl: resolver.config().min_ttl,
            backoff: resolver.config().refresh_backoff,
            resolver,
            host: self.host.clone(),
            port: self.port,
            weight: self.weight,
            publisher: Arc::clone(&publisher),
        };
        let task = tokio::spawn(refresher.run());

        DnsEndpointGroup {
            host: self.host,
            port: self.port,
            publisher,
            task: Mutex::new(Some(task)),
        }
    }
}

/// Endpoints of a host name, kept current by re-resolving after each answer's
/// TTL (never sooner than the TTL floor) or after a backoff on failure.
#[derive(Debug)]
pub struct DnsEndpointGroup {
    host: String,
    port: u16,
    publisher: Arc<Publisher>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl DnsEndpointGroup {
    pub fn builder(host: impl Into<String>, port: u16) -> DnsEndpointGroupBuilder {
        DnsEndpointGroupBuilder {
            host: host.into(),
            port,
            weight: DEFAULT_WEIGHT,
            address_families: None,
        }
    }

    /// Shorthand for `builder(host, port).build(resolver)`.
    pub fn new(resolver: DnsResolver, host: impl Into<String>, port: u16) -> Self {
        Self::builder(host, port).build(resolver)
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }
}

impl EndpointGroup for DnsEndpointGroup {
    fn endpoints(&self) -> Arc<[Endpoint]> {
        self.publisher.endpoints()
    }

    fn subscribe(&self) -> watch::Receiver<GroupState> {
        self.publisher.subscribe()
    }

    fn close(&self) {
        if self.publisher.close() {
            debug!("closing DNS endpoint group for {}", self.host);
        }
        if let Some(task) = self.task.lock().take() {
            task.abort();
        }
    }

    fn is_closed(&self) -> bool {
        self.publisher.is_closed()
    }
}

impl Drop for DnsEndpointGroup {
    fn drop(&mut self) {
        if let Some(task) = self.task.get_mut().take() {
            task.abort();
        }
    }
}

struct Refresher {
    resolver: DnsResolver,
    host: String,
    port: u16,
    weight: u32,
    families: AddressFamilies,
    min_ttl: Duration,
    backoff: Duration,
    publisher: Arc<Publisher>,
}

impl Refresher {
    async fn run(self) {
        loop {
            let delay = match self.resolve_once().await {
                Ok((endpoints, ttl)) if !endpoints.is_empty() => {
                    debug!(
                        "{} resolved to {} endpoints, next refresh in {:?}",
                        self.host,
                        endpoints.len(),
                        ttl.max(self.min_ttl)
                    );
                    if !self.publisher.update(endpoints.into(), true) {
                        return;
                    }
                    ttl.max(self.min_ttl)
                }
                Ok(_) => {
                    debug!("{} resolved to no addresses, retrying in {:?}", self.host, self.backoff);
                    self.backoff
                }
                Err(e) => {
                    warn!("failed to resolve {}: {}, retrying in {:?}", self.host, e, self.backoff);
                    self.backoff
                }
            };
            if self.publisher.is_closed() {
                return;
            }
            tokio::time::sleep(delay).await;
        }
    }

    async fn resolve_once(&self) -> crate::Result<(Vec<Endpoint>, Duration)> {
        let (addrs, ttl) = self.resolver.lookup_addresses(&self.host, self.families).await?;
        let endpoints = addrs
            .into_iter()
            .map(|ip| {
                Endpoint::of(self.host.clone(), self.port)
                    .with_ip(ip)
                    .with_weight(self.weight)
            })
            .collect();
        Ok((endpoints, ttl))
    }
}
