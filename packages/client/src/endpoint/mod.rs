//! Endpoints and endpoint groups
//!
//! An [`Endpoint`] is one addressable target. An [`EndpointGroup`] is an
//! observable, replace-on-change set of them.

use std::fmt;
use std::net::{IpAddr, SocketAddr};

use serde::{Deserialize, Serialize};

mod composite;
mod dns_group;
mod group;
mod static_group;

pub use composite::CompositeEndpointGroup;
pub use dns_group::{DnsEndpointGroup, DnsEndpointGroupBuilder};
pub use group::{EndpointGroup, GroupState};
pub use static_group::StaticEndpointGroup;

/// Weight given to endpoints unless stated otherwise.
pub const DEFAULT_WEIGHT: u32 = 1000;

/// An addressable target: host name and/or IP, port and weight.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    host: Option<String>,
    ip: Option<IpAddr>,
    port: u16,
    weight: u32,
}

impl Endpoint {
    /// An unresolved endpoint for a host name.
    pub fn of(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: Some(host.into()),
            ip: None,
            port,
            weight: DEFAULT_WEIGHT,
        }
    }

    /// A resolved endpoint with no host name.
    pub fn of_ip(ip: IpAddr, port: u16) -> Self {
        Self {
            host: None,
            ip: Some(ip),
            port,
            weight: DEFAULT_WEIGHT,
        }
    }

    /// Parses `host:port`, `a.b.c.d:port` or `[v6]:port`.
    ///
    /// # Errors
    ///
    /// Returns a builder error for a missing or invalid port, or an empty host.
    pub fn parse(authority: &str) -> crate::Result<Self> {
        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| crate::error::builder(format!("missing port in {authority:?}")))?;
        let port: u16 = port
            .parse()
            .map_err(|_| crate::error::builder(format!("invalid port in {authority:?}")))?;

        if let Some(v6) = host.strip_prefix('[').and_then(|h| h.strip_suffix(']')) {
            let ip: IpAddr = v6
                .parse()
                .map_err(|_| crate::error::builder(format!("invalid IPv6 literal {v6:?}")))?;
            return Ok(Self::of_ip(ip, port));
        }
        if host.is_empty() || host.contains(':') {
            return Err(crate::error::builder(format!("invalid host in {authority:?}")));
        }
        match host.parse::<IpAddr>() {
            Ok(ip) => Ok(Self::of_ip(ip, port)),
            Err(_) => Ok(Self::of(host.to_ascii_lowercase(), port)),
        }
    }

    pub fn host(&self) -> Option<&str> {
        self.host.as_deref()
    }

    pub fn ip(&self) -> Option<IpAddr> {
        self.ip
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn weight(&self) -> u32 {
        self.weight
    }

    /// Returns a copy resolved to `ip`, keeping the host name.
    #[must_use]
    pub fn with_ip(&self, ip: IpAddr) -> Self {
        Self {
            ip: Some(ip),
            ..self.clone()
        }
    }

    #[must_use]
    pub fn with_weight(mut self, weight: u32) -> Self {
        self.weight = weight;
        self
    }

    pub fn is_resolved(&self) -> bool {
        self.ip.is_some()
    }

    /// The socket address of a resolved endpoint; `None` until resolved.
    pub fn to_socket_addr(&self) -> Option<SocketAddr> {
        self.ip.map(|ip| SocketAddr::new(ip, self.port))
    }

    /// `host:port`, falling back to the IP when there is no host name.
    pub fn authority(&self) -> String {
        match (&self.host, self.ip) {
            (Some(host), _) => format!("{host}:{}", self.port),
            (None, Some(IpAddr::V6(ip))) => format!("[{ip}]:{}", self.port),
            (None, Some(IpAddr::V4(ip))) => format!("{ip}:{}", self.port),
            (None, None) => format!(":{}", self.port),
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.authority())?;
        if let (Some(_), Some(ip)) = (&self.host, self.ip) {
            write!(f, " ({ip})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_host_and_literals() {
        let ep = Endpoint::parse("Example.com:8080").expect("host");
        assert_eq!(ep.host(), Some("example.com"));
        assert!(!ep.is_resolved());
        assert!(ep.to_socket_addr().is_none());

        let ep = Endpoint::parse("10.0.0.1:80").expect("v4");
        assert_eq!(ep.to_socket_addr(), Some("10.0.0.1:80".parse().expect("addr")));

        let ep = Endpoint::parse("[::1]:443").expect("v6");
        assert_eq!(ep.authority(), "[::1]:443");

        assert!(Endpoint::parse("example.com").is_err());
        assert!(Endpoint::parse("::1:80").is_err());
    }

    #[test]
    fn equality_covers_every_field() {
        let a = Endpoint::of("a.example", 80);
        let resolved = a.with_ip("10.0.0.1".parse().expect("ip"));
        assert_ne!(a, resolved);
        assert_eq!(resolved.host(), Some("a.example"));
        assert_ne!(a.clone(), a.with_weight(1));
    }
}
