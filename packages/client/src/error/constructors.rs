use super::types::{Error, Kind, SharedCause};

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Creates an `Error` for a builder error.
pub fn builder<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Builder).with(e.into())
}

/// Creates an `Error` for a DNS query that no server answered in time.
pub fn resolution_timeout(name: &str) -> Error {
    Error::new(Kind::ResolutionTimeout).with(format!("no DNS server answered for {name}"))
}

/// Creates an `Error` for an authoritative negative answer.
pub fn name_not_found(name: &str) -> Error {
    Error::new(Kind::NameNotFound).with(format!("{name} does not exist"))
}

/// Creates an `Error` for any other resolution failure.
pub fn resolution<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Resolution).with(e.into())
}

/// Wraps a pre-execution abort cause.
///
/// The cause is shared, not copied: `source()` of the returned error is the
/// very cause recorded with `RequestContext::mark_unprocessed`.
pub fn unprocessed(cause: SharedCause) -> Error {
    Error::new(Kind::UnprocessedRequest).with_shared(cause)
}

/// Creates an `Error` for an exceeded redirect hop bound.
pub fn too_many_redirects(max_redirects: usize, url: url::Url) -> Error {
    Error::new(Kind::TooManyRedirects)
        .with(format!("more than {max_redirects} redirects"))
        .with_url(url)
}

/// Creates an `Error` for a revisited redirect target.
pub fn redirect_loop(url: url::Url) -> Error {
    Error::new(Kind::RedirectLoop).with_url(url)
}

/// Creates an `Error` for a redirect that cannot be followed.
pub fn redirect<E: Into<BoxError>>(e: E, url: url::Url) -> Error {
    Error::new(Kind::Redirect).with(e.into()).with_url(url)
}

pub fn endpoint_group_closed() -> Error {
    Error::new(Kind::EndpointGroupClosed)
}

pub fn empty_endpoint_group() -> Error {
    Error::new(Kind::EmptyEndpointGroup)
}

pub fn context<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Context).with(e.into())
}

/// Creates an `Error` for a transport failure.
pub fn transport<E: Into<BoxError>>(e: E) -> Error {
    Error::new(Kind::Transport).with(e.into())
}
