//! Decides whether and where a response redirects
//!
//! Each followed hop yields a derived [`RequestContext`] whose redirect chain
//! holds every signature visited so far. A hop back onto a visited signature
//! is a loop; the loop check runs before the hop bound.

use http::header::REFERER;
use http::{Method, StatusCode};
use tracing::debug;
use url::{Host, Url};

use super::headers::{make_referer, remove_content_headers, remove_sensitive_headers};
use super::signature::RedirectSignature;
use crate::config::RedirectConfig;
use crate::context::{RequestContext, RequestId};
use crate::endpoint::Endpoint;
use crate::http::{ClientRequest, ClientResponse};

/// Outcome of inspecting a response.
#[derive(Debug)]
pub enum Navigation {
    /// Execute this derived context next.
    Follow(RequestContext),
    /// The response is final.
    Terminal,
}

#[derive(Debug, Clone, Default)]
pub struct RedirectNavigator {
    config: RedirectConfig,
}

impl RedirectNavigator {
    pub fn new(config: RedirectConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RedirectConfig {
        &self.config
    }

    /// Computes the next hop for `response`, received for `ctx`.
    ///
    /// # Errors
    ///
    /// - `RedirectLoop` when the target was already visited with the same method
    /// - `TooManyRedirects` when the hop bound is exceeded
    /// - `Redirect` for unparsable, non-http(s) or disallowed plain-http targets
    pub fn next(
        &self,
        ctx: &RequestContext,
        response: &ClientResponse,
    ) -> crate::Result<Navigation> {
        if !is_redirect(response.status()) {
            return Ok(Navigation::Terminal);
        }
        let Some(location) = response.location() else {
            debug!("{} without Location, not following", response.status());
            return Ok(Navigation::Terminal);
        };

        let current = ctx.request();
        let mut next_url = current
            .url()
            .join(location)
            .map_err(|e| crate::error::redirect(e, current.url().clone()))?;
        next_url.set_fragment(None);

        if next_url.scheme() != "http" && next_url.scheme() != "https" {
            return Err(crate::error::redirect(
                format!("unsupported redirect scheme {:?}", next_url.scheme()),
                next_url,
            ));
        }
        if self.config.https_only && next_url.scheme() != "https" {
            return Err(crate::error::redirect("HTTPS required", next_url));
        }

        let see_other = response.status() == StatusCode::SEE_OTHER;
        let method = if see_other && current.method() != Method::HEAD {
            Method::GET
        } else {
            current.method().clone()
        };

        let current_signature = RedirectSignature::of(current);
        let next_signature = RedirectSignature::new(&next_url, &method);
        let chain = ctx.redirect_chain();
        if next_signature == current_signature || chain.contains(&next_signature) {
            debug!("redirect loop at {} {}", method, next_url);
            return Err(crate::error::redirect_loop(next_url));
        }
        if chain.hops() + 1 > self.config.max_redirects {
            return Err(crate::error::too_many_redirects(
                self.config.max_redirects,
                next_url,
            ));
        }

        let mut request = ClientRequest::new(method, next_url.clone());
        *request.headers_mut() = current.headers().clone();
        if see_other {
            remove_content_headers(request.headers_mut());
        } else {
            request = request.with_body(current.body().clone());
        }
        remove_sensitive_headers(request.headers_mut(), &next_url, current.url());
        if self.config.referer {
            if let Some(referer) = make_referer(&next_url, current.url()) {
                request.headers_mut().insert(REFERER, referer);
            } else {
                request.headers_mut().remove(REFERER);
            }
        }

        let endpoint_override = if same_authority(current.url(), &next_url) {
            None
        } else {
            endpoint_of(&next_url)
        };

        debug!(
            "following {} to {} {} (hop {})",
            response.status(),
            request.method(),
            next_url,
            chain.hops() + 1
        );
        let chain = chain.followed_by(current_signature, next_signature);
        Ok(Navigation::Follow(ctx.derive(
            RequestId::random(),
            request,
            endpoint_override,
            chain,
        )))
    }
}

/// Status codes that are followed.
pub fn is_redirect(status: StatusCode) -> bool {
    matches!(
        status,
        StatusCode::MOVED_PERMANENTLY
            | StatusCode::FOUND
            | StatusCode::SEE_OTHER
            | StatusCode::TEMPORARY_REDIRECT
            | StatusCode::PERMANENT_REDIRECT
    )
}

fn same_authority(a: &Url, b: &Url) -> bool {
    a.host() == b.host() && a.port_or_known_default() == b.port_or_known_default()
}

fn endpoint_of(url: &Url) -> Option<Endpoint> {
    let port = url.port_or_known_default()?;
    match url.host()? {
        Host::Domain(domain) => Some(Endpoint::of(domain, port)),
        Host::Ipv4(ip) => Some(Endpoint::of_ip(ip.into(), port)),
        Host::Ipv6(ip) => Some(Endpoint::of_ip(ip.into(), port)),
    }
}
