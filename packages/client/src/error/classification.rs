use std::error::Error as StdError;
use std::io;

use super::types::{Error, Kind};

impl Error {
    /// Returns true if the error is from a type Builder.
    #[must_use]
    pub fn is_builder(&self) -> bool {
        matches!(self.inner.kind, Kind::Builder)
    }

    /// Returns true if the error is related to a timeout.
    ///
    /// Besides `ResolutionTimeout`, any `io::ErrorKind::TimedOut` in the
    /// source chain counts.
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        if matches!(self.inner.kind, Kind::ResolutionTimeout) {
            return true;
        }

        let mut source = self.source();

        while let Some(err) = source {
            if let Some(io) = err.downcast_ref::<io::Error>()
                && io.kind() == io::ErrorKind::TimedOut
            {
                return true;
            }
            source = err.source();
        }

        false
    }

    /// Returns true if DNS reported that the name does not exist.
    #[must_use]
    pub fn is_name_not_found(&self) -> bool {
        matches!(self.inner.kind, Kind::NameNotFound)
    }

    /// Returns true for any DNS resolution failure.
    #[must_use]
    pub fn is_resolution(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::ResolutionTimeout | Kind::NameNotFound | Kind::Resolution
        )
    }

    /// Returns true if the request never reached the network.
    #[must_use]
    pub fn is_unprocessed(&self) -> bool {
        matches!(self.inner.kind, Kind::UnprocessedRequest)
    }

    /// Returns true if the redirect hop bound was exceeded.
    #[must_use]
    pub fn is_too_many_redirects(&self) -> bool {
        matches!(self.inner.kind, Kind::TooManyRedirects)
    }

    /// Returns true if a redirect target was revisited.
    #[must_use]
    pub fn is_redirect_loop(&self) -> bool {
        matches!(self.inner.kind, Kind::RedirectLoop)
    }

    /// Returns true for every redirect related failure.
    #[must_use]
    pub fn is_redirect(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::TooManyRedirects | Kind::RedirectLoop | Kind::Redirect
        )
    }

    #[must_use]
    pub fn is_transport(&self) -> bool {
        matches!(self.inner.kind, Kind::Transport)
    }

    /// Returns true if no endpoint could be selected.
    #[must_use]
    pub fn is_endpoint_unavailable(&self) -> bool {
        matches!(
            self.inner.kind,
            Kind::EndpointGroupClosed | Kind::EmptyEndpointGroup
        )
    }

    #[must_use]
    pub fn is_context(&self) -> bool {
        matches!(self.inner.kind, Kind::Context)
    }
}
