//! # Conduit client core
//!
//! Client-side runtime of an asynchronous HTTP/RPC library: resolves logical
//! endpoints to addresses, keeps connections alive, follows redirects without
//! looping and carries a per-request context through a decorator pipeline.
//!
//! ## Features
//!
//! - **DNS resolution** over UDP with TCP fallback on truncated answers
//! - **TTL-aware address cache** shared across concurrent lookups
//! - **Endpoint groups** that are static, DNS-backed or composite, observed
//!   through `tokio::sync::watch`
//! - **Request contexts** with typed attributes and derived sub-requests
//! - **Keep-alive** pings, idle detection and connection recycling
//! - **Redirect following** with loop detection and a hop bound
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use conduit_client::prelude::*;
//! use futures::future::BoxFuture;
//!
//! struct Echo;
//!
//! impl Transport for Echo {
//!     fn execute(
//!         &self,
//!         _endpoint: Endpoint,
//!         _request: ClientRequest,
//!     ) -> BoxFuture<'static, conduit_client::Result<ClientResponse>> {
//!         Box::pin(async { Ok(ClientResponse::new(StatusCode::OK)) })
//!     }
//! }
//!
//! # async fn run() -> conduit_client::Result<()> {
//! let resolver = DnsResolver::new(DnsConfig::default())?;
//! let group: Arc<dyn EndpointGroup> =
//!     Arc::new(DnsEndpointGroup::new(resolver.clone(), "example.com", 443));
//!
//! let client = ClientChain::new(EndpointClient::new(Echo, resolver))
//!     .decorate(RedirectingClient::new(RedirectConfig::default()))
//!     .build();
//!
//! let request = ClientRequest::get("https://example.com/")?;
//! let ctx = RequestContext::for_group(request.clone(), group);
//! let response = client.execute(ctx, request).await?;
//! assert_eq!(response.status(), StatusCode::OK);
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod context;
pub mod dns;
pub mod endpoint;
pub mod error;
pub mod http;
pub mod keepalive;
pub mod redirect;

pub mod prelude;

pub use error::{Error, Result};
pub use url::Url;
