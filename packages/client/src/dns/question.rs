//! DNS questions, records and responses
//!
//! Wire-independent views of what the resolver asks and what servers answer.

use std::fmt;
use std::net::IpAddr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Record kinds the resolver knows how to ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RecordKind {
    A,
    Aaaa,
    Cname,
    Srv,
    Txt,
}

impl fmt::Display for RecordKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            RecordKind::A => "A",
            RecordKind::Aaaa => "AAAA",
            RecordKind::Cname => "CNAME",
            RecordKind::Srv => "SRV",
            RecordKind::Txt => "TXT",
        })
    }
}

/// A normalized `(name, kind)` pair, also the cache key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DnsQuestion {
    name: String,
    kind: RecordKind,
}

impl DnsQuestion {
    /// Creates a question; the name is lowercased and loses its trailing dot.
    pub fn new(name: impl AsRef<str>, kind: RecordKind) -> Self {
        let name = name.as_ref();
        let name = name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase();
        Self { name, kind }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn kind(&self) -> RecordKind {
        self.kind
    }

    /// Parses the name as an IP literal, if it is one.
    #[must_use]
    pub fn ip_literal(&self) -> Option<IpAddr> {
        let name = self
            .name
            .strip_prefix('[')
            .and_then(|n| n.strip_suffix(']'))
            .unwrap_or(&self.name);
        name.parse().ok()
    }
}

impl fmt::Display for DnsQuestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.kind)
    }
}

/// Record payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordData {
    Addr(IpAddr),
    Cname(String),
    Srv {
        priority: u16,
        weight: u16,
        port: u16,
        target: String,
    },
    Txt(Vec<String>),
}

/// A single answer record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsRecord {
    pub name: String,
    pub kind: RecordKind,
    pub ttl: Duration,
    pub data: RecordData,
}

impl DnsRecord {
    /// Address record for `name`.
    pub fn addr(name: impl AsRef<str>, ip: IpAddr, ttl: Duration) -> Self {
        let kind = match ip {
            IpAddr::V4(_) => RecordKind::A,
            IpAddr::V6(_) => RecordKind::Aaaa,
        };
        Self {
            name: DnsQuestion::new(name, kind).name,
            kind,
            ttl,
            data: RecordData::Addr(ip),
        }
    }

    /// The address carried by an `A`/`AAAA` record.
    #[must_use]
    pub fn ip(&self) -> Option<IpAddr> {
        match self.data {
            RecordData::Addr(ip) => Some(ip),
            _ => None,
        }
    }
}

/// Server response codes the resolver distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseCode {
    NoError,
    NxDomain,
    ServFail,
    Refused,
    Other(u16),
}

/// A decoded response.
///
/// `truncated` responses are incomplete and never authoritative on their own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsResponse {
    pub records: Vec<DnsRecord>,
    pub truncated: bool,
    pub code: ResponseCode,
}

impl DnsResponse {
    /// A complete `NOERROR` answer.
    #[must_use]
    pub fn answer(records: Vec<DnsRecord>) -> Self {
        Self {
            records,
            truncated: false,
            code: ResponseCode::NoError,
        }
    }

    /// A `NOERROR` answer with the TC bit set.
    #[must_use]
    pub fn truncated(records: Vec<DnsRecord>) -> Self {
        Self {
            truncated: true,
            ..Self::answer(records)
        }
    }

    /// An empty answer with the given code.
    #[must_use]
    pub fn with_code(code: ResponseCode) -> Self {
        Self {
            records: Vec::new(),
            truncated: false,
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn question_names_are_normalized() {
        let a = DnsQuestion::new("Foo.Example.COM.", RecordKind::A);
        let b = DnsQuestion::new("foo.example.com", RecordKind::A);
        assert_eq!(a, b);
        assert_eq!(a.name(), "foo.example.com");
        assert_ne!(a, DnsQuestion::new("foo.example.com", RecordKind::Aaaa));
    }

    #[test]
    fn ip_literals_are_recognized() {
        assert!(DnsQuestion::new("127.0.0.1", RecordKind::A).ip_literal().is_some());
        assert!(DnsQuestion::new("[::1]", RecordKind::Aaaa).ip_literal().is_some());
        assert!(DnsQuestion::new("example.com", RecordKind::A).ip_literal().is_none());
    }
}
