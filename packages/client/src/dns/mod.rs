//! DNS resolution
//!
//! Questions go through [`DnsResolver`], which consults a [`HostsFile`] and
//! an [`AddressCache`] before asking the configured name servers.

pub mod cache;
pub mod error;
pub mod hosts;
pub mod question;
pub mod resolver;
pub mod transport;

pub use cache::{AddressCache, CacheEntry, CachedAnswer, NoopAddressCache, TtlAddressCache};
pub use error::ResolverError;
pub use hosts::HostsFile;
pub use question::{DnsQuestion, DnsRecord, DnsResponse, RecordData, RecordKind, ResponseCode};
pub use resolver::{DnsResolver, Resolved};
pub use transport::{DnsTransport, TcpTransport, UdpTransport};
