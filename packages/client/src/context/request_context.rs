//! Per-request execution context
//!
//! A [`RequestContext`] is a cheap handle; clones share the same state.
//! Derived contexts get their own state, seeded from a snapshot of the
//! parent's attributes.

use std::any::Any;
use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::trace;

use super::attribute::AttributeKey;
use crate::endpoint::{Endpoint, EndpointGroup};
use crate::error::SharedCause;
use crate::http::ClientRequest;
use crate::redirect::RedirectChain;

type AttributeValue = Arc<dyn Any + Send + Sync>;

/// Identifier of one request execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestId(u64);

impl RequestId {
    pub fn random() -> Self {
        Self(fastrand::u64(..))
    }

    pub fn from_u64(id: u64) -> Self {
        Self(id)
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.0)
    }
}

/// Where a request is headed.
#[derive(Debug, Clone)]
pub enum Target {
    Endpoint(Endpoint),
    Group(Arc<dyn EndpointGroup>),
}

/// Builder for a root [`RequestContext`]
#[derive(Debug)]
pub struct RequestContextBuilder {
    id: Option<RequestId>,
    request: ClientRequest,
    target: Target,
}

impl RequestContextBuilder {
    #[must_use]
    pub fn id(mut self, id: RequestId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn build(self) -> RequestContext {
        RequestContext::from_parts(
            self.id.unwrap_or_else(RequestId::random),
            self.request,
            self.target,
            DashMap::new(),
            None,
            RedirectChain::default(),
        )
    }
}

/// Mutable, shared state of one logical call.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

struct Inner {
    id: RequestId,
    request: ClientRequest,
    target: Target,
    endpoint: Mutex<Option<Endpoint>>,
    attrs: DashMap<u64, AttributeValue>,
    parent: Option<RequestContext>,
    timed_out: AtomicBool,
    unprocessed: Mutex<Option<SharedCause>>,
    completed: AtomicBool,
    redirect_chain: RedirectChain,
}

impl RequestContext {
    pub fn builder(request: ClientRequest, target: Target) -> RequestContextBuilder {
        RequestContextBuilder {
            id: None,
            request,
            target,
        }
    }

    /// A root context against a single endpoint.
    pub fn for_endpoint(request: ClientRequest, endpoint: Endpoint) -> Self {
        Self::builder(request, Target::Endpoint(endpoint)).build()
    }

    /// A root context against an endpoint group.
    pub fn for_group(request: ClientRequest, group: Arc<dyn EndpointGroup>) -> Self {
        Self::builder(request, Target::Group(group)).build()
    }

    fn from_parts(
        id: RequestId,
        request: ClientRequest,
        target: Target,
        attrs: DashMap<u64, AttributeValue>,
        parent: Option<RequestContext>,
        redirect_chain: RedirectChain,
    ) -> Self {
        let endpoint = match &target {
            Target::Endpoint(endpoint) => Some(endpoint.clone()),
            Target::Group(_) => None,
        };
        Self {
            inner: Arc::new(Inner {
                id,
                request,
                target,
                endpoint: Mutex::new(endpoint),
                attrs,
                parent,
                timed_out: AtomicBool::new(false),
                unprocessed: Mutex::new(None),
                completed: AtomicBool::new(false),
                redirect_chain,
            }),
        }
    }

    pub fn id(&self) -> RequestId {
        self.inner.id
    }

    pub fn request(&self) -> &ClientRequest {
        &self.inner.request
    }

    pub fn target(&self) -> &Target {
        &self.inner.target
    }

    /// The selected endpoint; known up front for single-endpoint targets.
    pub fn endpoint(&self) -> Option<Endpoint> {
        self.inner.endpoint.lock().clone()
    }

    /// Records the endpoint selected for this execution.
    ///
    /// # Errors
    ///
    /// Returns a context error once the context is complete.
    pub fn set_endpoint(&self, endpoint: Endpoint) -> crate::Result<()> {
        self.ensure_open("set_endpoint")?;
        *self.inner.endpoint.lock() = Some(endpoint);
        Ok(())
    }

    pub fn attribute<T: Send + Sync + 'static>(&self, key: &AttributeKey<T>) -> Option<Arc<T>> {
        let value = self.inner.attrs.get(&key.id()).map(|v| Arc::clone(v.value()))?;
        value.downcast::<T>().ok()
    }

    pub fn has_attribute<T>(&self, key: &AttributeKey<T>) -> bool {
        self.inner.attrs.contains_key(&key.id())
    }

    /// Sets an attribute, replacing any previous value for the key.
    ///
    /// # Errors
    ///
    /// Returns a context error once the context is complete.
    pub fn set_attribute<T: Send + Sync + 'static>(
        &self,
        key: &AttributeKey<T>,
        value: T,
    ) -> crate::Result<()> {
        self.ensure_open("set_attribute")?;
        self.inner.attrs.insert(key.id(), Arc::new(value));
        Ok(())
    }

    /// Creates a child context for a sub-request.
    ///
    /// The child gets `id`, `request`, a snapshot of this context's
    /// attributes and, when given, `endpoint_override` as its target. It does
    /// not inherit the unprocessed marker or the timed-out flag.
    pub fn new_derived_context(
        &self,
        id: RequestId,
        request: ClientRequest,
        endpoint_override: Option<Endpoint>,
    ) -> RequestContext {
        self.derive(id, request, endpoint_override, self.inner.redirect_chain.clone())
    }

    pub(crate) fn derive(
        &self,
        id: RequestId,
        request: ClientRequest,
        endpoint_override: Option<Endpoint>,
        redirect_chain: RedirectChain,
    ) -> RequestContext {
        let attrs: DashMap<u64, AttributeValue> = self
            .inner
            .attrs
            .iter()
            .map(|entry| (*entry.key(), Arc::clone(entry.value())))
            .collect();
        let target = match endpoint_override {
            Some(endpoint) => Target::Endpoint(endpoint),
            None => self.inner.target.clone(),
        };
        trace!("deriving context {} from {}", id, self.inner.id);
        Self::from_parts(id, request, target, attrs, Some(self.clone()), redirect_chain)
    }

    /// Aborts execution of this context before any I/O takes place.
    ///
    /// The terminal client fails with `UnprocessedRequest` carrying `cause`.
    pub fn mark_unprocessed<E>(&self, cause: E)
    where
        E: StdError + Send + Sync + 'static,
    {
        self.mark_unprocessed_shared(Arc::new(cause));
    }

    /// Like [`mark_unprocessed`](Self::mark_unprocessed), keeping the identity
    /// of an already shared cause.
    pub fn mark_unprocessed_shared(&self, cause: SharedCause) {
        *self.inner.unprocessed.lock() = Some(cause);
    }

    pub fn unprocessed_cause(&self) -> Option<SharedCause> {
        self.inner.unprocessed.lock().clone()
    }

    pub fn is_timed_out(&self) -> bool {
        self.inner.timed_out.load(Ordering::Acquire)
    }

    pub fn set_timed_out(&self) {
        self.inner.timed_out.store(true, Ordering::Release);
    }

    /// The context this one was derived from.
    pub fn parent(&self) -> Option<&RequestContext> {
        self.inner.parent.as_ref()
    }

    /// The first context of the derivation chain; itself for a root.
    pub fn root(&self) -> RequestContext {
        let mut current = self;
        while let Some(parent) = current.parent() {
            current = parent;
        }
        current.clone()
    }

    pub fn is_root(&self) -> bool {
        self.inner.parent.is_none()
    }

    /// Marks the execution finished; later writes fail.
    pub fn complete(&self) {
        self.inner.completed.store(true, Ordering::Release);
    }

    pub fn is_complete(&self) -> bool {
        self.inner.completed.load(Ordering::Acquire)
    }

    pub fn redirect_chain(&self) -> &RedirectChain {
        &self.inner.redirect_chain
    }

    /// Whether both handles share the same state.
    pub fn ptr_eq(&self, other: &RequestContext) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn ensure_open(&self, op: &str) -> crate::Result<()> {
        if self.is_complete() {
            return Err(crate::error::context(format!(
                "{op} called on completed context {}",
                self.inner.id
            )));
        }
        Ok(())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("id", &self.inner.id)
            .field("method", self.inner.request.method())
            .field("url", &self.inner.request.url().as_str())
            .field("endpoint", &*self.inner.endpoint.lock())
            .field("parent", &self.inner.parent.as_ref().map(RequestContext::id))
            .field("timed_out", &self.is_timed_out())
            .finish()
    }
}
