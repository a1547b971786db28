use std::sync::Arc;

use hashbrown::HashSet;
use http::Method;
use url::Url;

use crate::http::ClientRequest;

/// Identity of one redirect hop: the target URL without fragment, and the
/// method used to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RedirectSignature {
    url: Url,
    method: Method,
}

impl RedirectSignature {
    pub fn new(url: &Url, method: &Method) -> Self {
        let mut url = url.clone();
        url.set_fragment(None);
        Self {
            url,
            method: method.clone(),
        }
    }

    pub fn of(request: &ClientRequest) -> Self {
        Self::new(request.url(), request.method())
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn method(&self) -> &Method {
        &self.method
    }
}

/// Signatures visited so far and the number of hops taken.
///
/// The set is shared between contexts and never mutated; following a hop
/// builds a new one.
#[derive(Debug, Clone, Default)]
pub struct RedirectChain {
    visited: Arc<HashSet<RedirectSignature>>,
    hops: usize,
}

impl RedirectChain {
    pub fn contains(&self, signature: &RedirectSignature) -> bool {
        self.visited.contains(signature)
    }

    pub fn hops(&self) -> usize {
        self.hops
    }

    pub fn visited(&self) -> impl Iterator<Item = &RedirectSignature> {
        self.visited.iter()
    }

    /// The chain after one more hop from `current` to `next`.
    pub(crate) fn followed_by(&self, current: RedirectSignature, next: RedirectSignature) -> Self {
        let mut visited = HashSet::clone(&self.visited);
        visited.insert(current);
        visited.insert(next);
        Self {
            visited: Arc::new(visited),
            hops: self.hops + 1,
        }
    }
}
