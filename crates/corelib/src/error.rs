//! Error types for the core library.

use thiserror::Error;

/// Result type alias for the core library.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the core library.
///
/// Every variant is local to the call that produced it: the ring is left in
/// a valid state and later operations are unaffected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// A worker with this id is already registered
    #[error("worker id '{0}' already exists in the hash ring")]
    DuplicateWorker(String),

    /// No registered worker matches the given hostname or id
    #[error("worker '{0}' not found or may have been removed")]
    WorkerNotFound(String),

    /// The request path is not served by any worker
    #[error("'{0}' endpoint does not exist in server replicas")]
    PathNotRegistered(String),

    /// Lookup attempted against a ring with no positions
    #[error("hash ring is empty")]
    EmptyRing,

    /// The resolver has no network endpoint for this hostname
    #[error("no network endpoint known for host '{0}'")]
    EndpointNotFound(String),

    /// Worker id has no numeric form
    #[error("invalid worker id '{0}': expected an optional letter prefix followed by digits")]
    InvalidWorkerId(String),

    /// Ring or seed configuration rejected
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Administrative request with an inconsistent shape
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

impl Error {
    /// Short machine-readable label, used for metrics and status payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::DuplicateWorker(_) => "duplicate_worker",
            Error::WorkerNotFound(_) => "worker_not_found",
            Error::PathNotRegistered(_) => "path_not_registered",
            Error::EmptyRing => "empty_ring",
            Error::EndpointNotFound(_) => "endpoint_not_found",
            Error::InvalidWorkerId(_) => "invalid_worker_id",
            Error::InvalidConfig(_) => "invalid_config",
            Error::InvalidRequest(_) => "invalid_request",
        }
    }
}
