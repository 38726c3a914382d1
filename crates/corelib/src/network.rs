//! Endpoint resolution contract.
//!
//! The ring only knows worker identities. Turning a hostname into a network
//! address is the job of an external registry (container runtime, service
//! discovery); the core consumes it through [`EndpointResolver`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Network location of a worker.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Endpoint {
    pub address: String,
    pub port: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, port: u16) -> Self {
        Self {
            address: address.into(),
            port,
        }
    }

    /// URL a request for `path` should be forwarded to.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "http://{}:{}/{}",
            self.address,
            self.port,
            path.trim_start_matches('/')
        )
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.port)
    }
}

/// Resolves a worker hostname to its network endpoint.
///
/// Implementations may block; the core never calls a resolver while holding
/// the ring lock.
pub trait EndpointResolver: Send + Sync {
    /// Fails with [`Error::EndpointNotFound`] for unknown hostnames.
    fn resolve(&self, hostname: &str) -> Result<Endpoint>;
}

impl<T: EndpointResolver + ?Sized> EndpointResolver for Arc<T> {
    fn resolve(&self, hostname: &str) -> Result<Endpoint> {
        (**self).resolve(hostname)
    }
}

/// In-memory hostname table.
#[derive(Debug, Default)]
pub struct StaticResolver {
    endpoints: RwLock<HashMap<String, Endpoint>>,
}

impl StaticResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register or replace the endpoint for `hostname`.
    pub fn register(&self, hostname: impl Into<String>, endpoint: Endpoint) -> Option<Endpoint> {
        self.endpoints.write().insert(hostname.into(), endpoint)
    }

    pub fn unregister(&self, hostname: &str) -> Option<Endpoint> {
        self.endpoints.write().remove(hostname)
    }

    pub fn len(&self) -> usize {
        self.endpoints.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.read().is_empty()
    }
}

impl FromIterator<(String, Endpoint)> for StaticResolver {
    fn from_iter<I: IntoIterator<Item = (String, Endpoint)>>(iter: I) -> Self {
        Self {
            endpoints: RwLock::new(iter.into_iter().collect()),
        }
    }
}

impl EndpointResolver for StaticResolver {
    fn resolve(&self, hostname: &str) -> Result<Endpoint> {
        self.endpoints
            .read()
            .get(hostname)
            .cloned()
            .ok_or_else(|| Error::EndpointNotFound(hostname.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_for() {
        let ep = Endpoint::new("10.0.0.5", 5051);
        assert_eq!(ep.url_for("home"), "http://10.0.0.5:5051/home");
        assert_eq!(ep.url_for("/home"), "http://10.0.0.5:5051/home");
        assert_eq!(ep.to_string(), "10.0.0.5:5051");
    }

    #[test]
    fn test_static_resolver() {
        let resolver = StaticResolver::new();
        resolver.register("hostA", Endpoint::new("10.0.0.1", 5051));
        assert_eq!(resolver.resolve("hostA").unwrap().port, 5051);
        assert_eq!(
            resolver.resolve("hostZ").unwrap_err(),
            Error::EndpointNotFound("hostZ".to_string())
        );

        resolver.unregister("hostA");
        assert!(resolver.is_empty());
    }

    #[test]
    fn test_resolver_through_arc() {
        let resolver: Arc<dyn EndpointResolver> = Arc::new(
            [("hostB".to_string(), Endpoint::new("10.0.0.2", 5052))]
                .into_iter()
                .collect::<StaticResolver>(),
        );
        assert_eq!(resolver.resolve("hostB").unwrap().address, "10.0.0.2");
    }
}
