//! DNS answer caching with TTL support
//!
//! Entries are immutable once stored: a refresh replaces the whole entry, so a
//! reader holding an `Arc<CacheEntry>` never observes a partial update. Expiry
//! is lazy, an entry at or past its deadline is dropped when it is looked up.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;
use tracing::debug;

use super::question::{DnsQuestion, DnsRecord};
use crate::config::CacheStrategy;

/// What was learned about a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedAnswer {
    Records(Arc<[DnsRecord]>),
    /// Authoritative name-not-found.
    NameNotFound,
}

/// A cached answer and its deadline.
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub answer: CachedAnswer,
    expires_at: Instant,
    provisional: bool,
}

impl CacheEntry {
    /// Creates an entry living for `ttl` from now.
    ///
    /// `provisional` marks answers whose TTL was below the configured floor:
    /// they are served until their own expiry but callers should not build
    /// long-lived state on them.
    pub fn new(answer: CachedAnswer, ttl: Duration, provisional: bool) -> Self {
        Self {
            answer,
            expires_at: Instant::now() + ttl,
            provisional,
        }
    }

    #[must_use]
    pub fn expires_at(&self) -> Instant {
        self.expires_at
    }

    #[must_use]
    pub fn is_provisional(&self) -> bool {
        self.provisional
    }

    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Shared store of resolved answers.
pub trait AddressCache: Send + Sync + fmt::Debug {
    /// Returns a live entry; never one at or past its expiry.
    fn get(&self, question: &DnsQuestion) -> Option<Arc<CacheEntry>>;

    /// Stores an entry, replacing any previous one for the question.
    fn put(&self, question: DnsQuestion, entry: CacheEntry);

    fn invalidate(&self, question: &DnsQuestion);
}

/// Builds the cache selected by the configuration.
pub fn from_strategy(strategy: CacheStrategy) -> Arc<dyn AddressCache> {
    match strategy {
        CacheStrategy::Ttl { max_entries } => Arc::new(TtlAddressCache::new(max_entries)),
        CacheStrategy::Disabled => Arc::new(NoopAddressCache),
    }
}

/// Bounded TTL cache on a concurrent map
#[derive(Debug)]
pub struct TtlAddressCache {
    entries: DashMap<DnsQuestion, Arc<CacheEntry>>,
    max_entries: usize,
}

impl TtlAddressCache {
    pub fn new(max_entries: usize) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
        }
    }

    /// Drops every expired entry, returning how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired());
        let removed = before.saturating_sub(self.entries.len());
        if removed > 0 {
            debug!("Purged {} expired DNS cache entries", removed);
        }
        removed
    }

    fn evict_entries(&self) {
        if self.purge_expired() > 0 && self.entries.len() < self.max_entries {
            return;
        }

        let to_remove: Vec<DnsQuestion> = self
            .entries
            .iter()
            .take((self.max_entries / 10).max(1))
            .map(|entry| entry.key().clone())
            .collect();

        for key in to_remove {
            self.entries.remove(&key);
        }

        debug!(
            "Evicted DNS cache entries, cache size: {}",
            self.entries.len()
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl AddressCache for TtlAddressCache {
    fn get(&self, question: &DnsQuestion) -> Option<Arc<CacheEntry>> {
        let entry = self.entries.get(question).map(|e| Arc::clone(e.value()))?;
        if entry.is_expired() {
            self.entries
                .remove_if(question, |_, current| Arc::ptr_eq(current, &entry));
            debug!("Removed expired DNS cache entry for {}", question);
            return None;
        }
        debug!("DNS cache hit for {}", question);
        Some(entry)
    }

    fn put(&self, question: DnsQuestion, entry: CacheEntry) {
        if !self.entries.contains_key(&question) && self.entries.len() >= self.max_entries {
            self.evict_entries();
        }
        self.entries.insert(question, Arc::new(entry));
    }

    fn invalidate(&self, question: &DnsQuestion) {
        self.entries.remove(question);
    }
}

/// Cache that never stores anything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAddressCache;

impl AddressCache for NoopAddressCache {
    fn get(&self, _question: &DnsQuestion) -> Option<Arc<CacheEntry>> {
        None
    }

    fn put(&self, _question: DnsQuestion, _entry: CacheEntry) {}

    fn invalidate(&self, _question: &DnsQuestion) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::RecordKind;

    fn answer() -> CachedAnswer {
        CachedAnswer::Records(Arc::from(Vec::new()))
    }

    #[tokio::test(start_paused = true)]
    async fn entries_are_not_served_at_expiry() {
        let cache = TtlAddressCache::new(8);
        let q = DnsQuestion::new("example.com", RecordKind::A);
        cache.put(q.clone(), CacheEntry::new(answer(), Duration::from_secs(5), false));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert!(cache.get(&q).is_some());

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(cache.get(&q).is_none());
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn full_cache_evicts_before_insert() {
        let cache = TtlAddressCache::new(10);
        for i in 0..10 {
            let q = DnsQuestion::new(format!("host{i}.example"), RecordKind::A);
            cache.put(q, CacheEntry::new(answer(), Duration::from_secs(60), false));
        }
        assert_eq!(cache.len(), 10);

        let q = DnsQuestion::new("extra.example", RecordKind::A);
        cache.put(q.clone(), CacheEntry::new(answer(), Duration::from_secs(60), false));
        assert_eq!(cache.len(), 10);
        assert!(cache.get(&q).is_some());
    }

    #[test]
    fn noop_cache_always_misses() {
        let cache = NoopAddressCache;
        let q = DnsQuestion::new("example.com", RecordKind::A);
        cache.put(q.clone(), CacheEntry::new(answer(), Duration::from_secs(60), false));
        assert!(cache.get(&q).is_none());
    }
}
