//! Static host name entries consulted before any DNS query

use std::io;
use std::net::IpAddr;
use std::path::Path;

use hashbrown::HashMap;

use super::question::RecordKind;

/// Parsed `/etc/hosts`-style entries.
///
/// Names are matched case-insensitively and without a trailing dot. The
/// first address listed for a name comes first in lookups.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostsFile {
    entries: HashMap<String, Vec<IpAddr>>,
}

impl HostsFile {
    /// Parses hosts file content. Malformed lines are skipped.
    pub fn parse(content: &str) -> Self {
        let mut hosts = Self::default();
        for line in content.lines() {
            let line = line.split('#').next().unwrap_or_default();
            let mut fields = line.split_whitespace();
            let Some(Ok(ip)) = fields.next().map(str::parse::<IpAddr>) else {
                continue;
            };
            for name in fields {
                hosts.insert(name, ip);
            }
        }
        hosts
    }

    /// Reads and parses a hosts file.
    ///
    /// # Errors
    ///
    /// Returns the I/O error when the file cannot be read.
    pub fn load(path: impl AsRef<Path>) -> io::Result<Self> {
        Ok(Self::parse(&std::fs::read_to_string(path)?))
    }

    /// Adds an address for `name`, keeping earlier ones first.
    pub fn insert(&mut self, name: &str, ip: IpAddr) {
        let addrs = self.entries.entry(normalize(name)).or_default();
        if !addrs.contains(&ip) {
            addrs.push(ip);
        }
    }

    #[must_use]
    pub fn with_entry(mut self, name: &str, ip: IpAddr) -> Self {
        self.insert(name, ip);
        self
    }

    /// Addresses of `name` matching the record kind; empty for non-address kinds.
    pub fn lookup(&self, name: &str, kind: RecordKind) -> Vec<IpAddr> {
        let Some(addrs) = self.entries.get(&normalize(name)) else {
            return Vec::new();
        };
        addrs
            .iter()
            .copied()
            .filter(|ip| match kind {
                RecordKind::A => ip.is_ipv4(),
                RecordKind::Aaaa => ip.is_ipv6(),
                _ => false,
            })
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn normalize(name: &str) -> String {
    name.strip_suffix('.').unwrap_or(name).to_ascii_lowercase()
}
