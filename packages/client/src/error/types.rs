use std::error::Error as StdError;
use std::fmt;
use std::sync::Arc;

/// A Result alias where the Err case is `conduit_client::Error`.
pub type Result<T> = std::result::Result<T, Error>;

/// A shareable error cause.
///
/// Causes are reference counted so that a cause recorded on a request
/// context can be surfaced by every execution attempt made against it.
pub type SharedCause = Arc<dyn StdError + Send + Sync>;

/// Represents errors that can occur while resolving, executing or
/// redirecting a client request.
#[derive(Clone)]
pub struct Error {
    pub inner: Box<Inner>,
}

#[derive(Clone)]
pub struct Inner {
    pub kind: Kind,
    pub source: Option<SharedCause>,
    pub url: Option<url::Url>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    /// Configuration or request construction failure
    Builder,
    /// No DNS server answered within the query timeout
    ResolutionTimeout,
    /// Authoritative negative DNS answer
    NameNotFound,
    /// Any other DNS resolution failure
    Resolution,
    /// The request was aborted before any network I/O took place
    UnprocessedRequest,
    /// The redirect hop bound was exceeded
    TooManyRedirects,
    /// A redirect target was visited twice with the same method
    RedirectLoop,
    /// A redirect could not be followed
    Redirect,
    /// The endpoint group was closed before it became ready
    EndpointGroupClosed,
    /// The endpoint group has no endpoint to select
    EmptyEndpointGroup,
    /// A request context was used after it completed
    Context,
    /// Failure reported by the transport layer
    Transport,
}

impl Error {
    pub fn new(kind: Kind) -> Error {
        Error {
            inner: Box::new(Inner {
                kind,
                source: None,
                url: None,
            }),
        }
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with<E: Into<Box<dyn StdError + Send + Sync>>>(mut self, source: E) -> Error {
        self.inner.source = Some(Arc::from(source.into()));
        self
    }

    #[must_use = "Error builder methods return a new Error and should be used"]
    pub fn with_shared(mut self, source: SharedCause) -> Error {
        self.inner.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_url(mut self, url: url::Url) -> Self {
        self.inner.url = Some(url);
        self
    }

    /// Returns the kind of this error.
    #[must_use]
    pub fn kind(&self) -> Kind {
        self.inner.kind
    }

    /// Get the URL associated with this error, if any
    #[must_use]
    pub fn url(&self) -> Option<&url::Url> {
        self.inner.url.as_ref()
    }

    /// Returns the shared cause, keeping its identity.
    #[must_use]
    pub fn shared_source(&self) -> Option<&SharedCause> {
        self.inner.source.as_ref()
    }
}

impl fmt::Debug for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut f = f.debug_struct("conduit_client::Error");

        f.field("kind", &self.inner.kind);

        if let Some(ref source) = self.inner.source {
            f.field("source", source);
        }

        if let Some(ref url) = self.inner.url {
            f.field("url", url);
        }

        f.finish()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.kind {
            Kind::Builder => f.write_str("builder error")?,
            Kind::ResolutionTimeout => f.write_str("DNS resolution timed out")?,
            Kind::NameNotFound => f.write_str("DNS name not found")?,
            Kind::Resolution => f.write_str("DNS resolution failed")?,
            Kind::UnprocessedRequest => f.write_str("request was not processed")?,
            Kind::TooManyRedirects => f.write_str("too many redirects")?,
            Kind::RedirectLoop => f.write_str("redirect loop detected")?,
            Kind::Redirect => f.write_str("error following redirect")?,
            Kind::EndpointGroupClosed => f.write_str("endpoint group closed")?,
            Kind::EmptyEndpointGroup => f.write_str("no endpoint available")?,
            Kind::Context => f.write_str("request context misuse")?,
            Kind::Transport => f.write_str("transport error")?,
        }

        if let Some(ref url) = self.inner.url {
            write!(f, " for url ({url})")?;
        }

        Ok(())
    }
}

impl StdError for Error {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.inner
            .source
            .as_ref()
            .map(|err| &**err as &(dyn StdError + 'static))
    }
}
