//! DNS layer errors

use std::io;
use std::net::SocketAddr;

use super::question::ResponseCode;

/// Failures of a single exchange or of a whole resolution.
#[derive(Debug, thiserror::Error)]
pub enum ResolverError {
    #[error("query to {server} timed out")]
    Timeout { server: SocketAddr },

    #[error("no DNS server answered for {name}")]
    AllServersTimedOut { name: String },

    #[error("{name} does not exist")]
    NameNotFound { name: String },

    #[error("server {server} answered {code:?}")]
    ServerFailure { server: SocketAddr, code: ResponseCode },

    #[error("malformed DNS message: {0}")]
    Proto(String),

    #[error("response id {received} does not match query id {expected}")]
    IdMismatch { expected: u16, received: u16 },

    #[error("resolving {name} needed more than {limit} queries")]
    QueryLimitExceeded { name: String, limit: u32 },

    #[error("no DNS server configured")]
    NoServers,

    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ResolverError {
    /// Whether the primary transport failed in a way worth a fallback attempt.
    pub(crate) fn is_transport_failure(&self) -> bool {
        matches!(self, ResolverError::Io(_) | ResolverError::IdMismatch { .. })
    }
}

impl From<ResolverError> for crate::Error {
    fn from(err: ResolverError) -> Self {
        match err {
            ResolverError::AllServersTimedOut { name } => crate::error::resolution_timeout(&name),
            ResolverError::NameNotFound { name } => crate::error::name_not_found(&name),
            other => crate::error::resolution(other),
        }
    }
}
