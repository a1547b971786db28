//! Terminal client: endpoint selection and hand-off to the transport

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures::future::BoxFuture;
use tracing::debug;

use super::chain::Client;
use crate::context::{RequestContext, Target};
use crate::dns::DnsResolver;
use crate::endpoint::Endpoint;
use crate::http::{ClientRequest, ClientResponse};

/// Wire-level execution of a request against one endpoint.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        endpoint: Endpoint,
        request: ClientRequest,
    ) -> BoxFuture<'static, crate::Result<ClientResponse>>;
}

/// Last element of every pipeline.
///
/// Fails a context marked unprocessed before touching the endpoint group,
/// then waits for the group and picks an endpoint in rotation. An endpoint
/// that only carries a host name, such as a redirect target on another host,
/// is resolved before the transport sees it. The context is completed on
/// every path out of `execute`.
pub struct EndpointClient<T> {
    transport: Arc<T>,
    resolver: DnsResolver,
    next_index: Arc<AtomicUsize>,
}

impl<T: Transport + 'static> EndpointClient<T> {
    pub fn new(transport: T, resolver: DnsResolver) -> Self {
        Self::from_arc(Arc::new(transport), resolver)
    }

    pub fn from_arc(transport: Arc<T>, resolver: DnsResolver) -> Self {
        Self {
            transport,
            resolver,
            next_index: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Picks the endpoint for this execution, resolved to an address.
async fn select_endpoint(
    ctx: &RequestContext,
    resolver: &DnsResolver,
    next_index: &AtomicUsize,
) -> crate::Result<Endpoint> {
    if let Some(cause) = ctx.unprocessed_cause() {
        debug!("context {} marked unprocessed: {}", ctx.id(), cause);
        return Err(crate::error::unprocessed(cause));
    }

    let endpoint = match ctx.target() {
        Target::Endpoint(endpoint) => endpoint.clone(),
        Target::Group(group) => {
            let endpoints = group.when_ready().await?;
            if endpoints.is_empty() {
                return Err(crate::error::empty_endpoint_group());
            }
            let index = next_index.fetch_add(1, Ordering::Relaxed) % endpoints.len();
            endpoints[index].clone()
        }
    };
    if endpoint.is_resolved() {
        return Ok(endpoint);
    }

    let host = endpoint
        .host()
        .ok_or_else(|| crate::error::resolution(format!("endpoint {endpoint} has no host")))?;
    let families = resolver.config().address_families;
    let (addrs, _) = resolver.lookup_addresses(host, families).await?;
    let ip = addrs
        .first()
        .copied()
        .ok_or_else(|| crate::error::name_not_found(host))?;
    debug!("context {} resolved {} to {}", ctx.id(), host, ip);
    Ok(endpoint.with_ip(ip))
}

impl<T: Transport + 'static> Client<ClientRequest, ClientResponse> for EndpointClient<T> {
    fn execute(
        &self,
        ctx: RequestContext,
        req: ClientRequest,
    ) -> BoxFuture<'static, crate::Result<ClientResponse>> {
        let transport = Arc::clone(&self.transport);
        let resolver = self.resolver.clone();
        let next_index = Arc::clone(&self.next_index);
        Box::pin(async move {
            let result = match select_endpoint(&ctx, &resolver, &next_index).await {
                Ok(endpoint) => match ctx.set_endpoint(endpoint.clone()) {
                    Ok(()) => {
                        debug!("context {} executing against {}", ctx.id(), endpoint);
                        transport.execute(endpoint, req).await
                    }
                    Err(e) => Err(e),
                },
                Err(e) => Err(e),
            };
            ctx.complete();
            result.map_err(|e| match e.url() {
                Some(_) => e,
                None => e.with_url(ctx.request().url().clone()),
            })
        })
    }
}
