//! Conduit client prelude
//!
//! The types most callers touch when assembling a pipeline.

pub use crate::client::{Client, ClientChain, Decorator, EndpointClient, Next, TimeoutDecorator, Transport};
pub use crate::config::{
    AddressFamilies, CacheStrategy, ClientConfig, DnsConfig, KeepAliveConfig, RedirectConfig,
    Validator,
};
pub use crate::context::{AttributeKey, RequestContext, RequestId, Target};
pub use crate::dns::{DnsQuestion, DnsRecord, DnsResolver, RecordKind};
pub use crate::endpoint::{
    CompositeEndpointGroup, DnsEndpointGroup, Endpoint, EndpointGroup, StaticEndpointGroup,
};
pub use crate::error::{Error, Result};
pub use crate::http::{ClientRequest, ClientResponse};
pub use crate::keepalive::{KeepAliveDriver, KeepAliveHandler, Protocol};
pub use crate::redirect::{Navigation, RedirectNavigator, RedirectingClient};

pub use ::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
pub use url::Url;
