use std::collections::TryReserveError;
use std::io;
use thiserror::Error as ThisError;

#[non_exhaustive]
#[derive(Debug, ThisError)]
pub enum Error {
    /// No address entry of any family carried this interface name.
    #[error("no such interface: {0:?}")]
    NoSuchInterface(String),
    #[error("unable to enumerate interfaces: {0}")]
    Enumeration(io::Error),
    #[error("unable to query the routing table: {0}")]
    RouteQuery(io::Error),
    #[error("gateway discovery is not supported on this platform")]
    UnsupportedPlatform,
    #[error("out of memory")]
    OutOfMemory,
}

impl Error {
    pub(crate) fn enumeration<E: Into<io::Error>>(e: E) -> Self {
        Self::Enumeration(e.into())
    }

    pub(crate) fn route_query<E: Into<io::Error>>(e: E) -> Self {
        Self::RouteQuery(e.into())
    }
}

impl From<TryReserveError> for Error {
    fn from(_: TryReserveError) -> Self {
        Self::OutOfMemory
    }
}
