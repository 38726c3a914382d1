//! Request routing over the shared ring.
//!
//! A route goes: registered-path check → `request_key(path)` →
//! `request_hash` → successor lookup → worker identity. The endpoint
//! resolver is consulted after the ring lock has been released.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::request_key;
use crate::network::{Endpoint, EndpointResolver, StaticResolver};
use crate::registry::{self, RequestPathRegistry};
use crate::ring::SharedRing;
use crate::topology::Membership;
use crate::worker::WorkerIdentity;

/// Where a request should be forwarded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteDecision {
    pub path: String,
    pub worker: WorkerIdentity,
    pub endpoint: Endpoint,
    /// `http://<address>:<port>/<path>`
    pub url: String,
}

/// Read-only front end to the ring.
///
/// Lookups only take the ring's read lock, so any number of them run
/// concurrently. The router keeps no per-request state.
#[derive(Debug)]
pub struct Router<R = StaticResolver> {
    ring: SharedRing,
    paths: RequestPathRegistry,
    resolver: R,
}

impl<R: EndpointResolver> Router<R> {
    pub fn new(ring: SharedRing, paths: RequestPathRegistry, resolver: R) -> Self {
        Self {
            ring,
            paths,
            resolver,
        }
    }

    /// Worker owning `path`.
    ///
    /// # Errors
    ///
    /// - [`Error::PathNotRegistered`] if `path` is not in the registry
    /// - [`Error::EmptyRing`] if no worker holds a position
    pub fn route(&self, path: &str) -> Result<Arc<WorkerIdentity>> {
        let path = registry::normalize(path);
        if !self.paths.contains(path) {
            return Err(self.reject(Error::PathNotRegistered(path.to_string())));
        }

        let key = request_key(path);
        let ring = self.ring.read();
        let position = ring.strategy().request_hash(key, ring.keyspace());
        let worker = ring
            .successor(position)
            .map(Arc::clone)
            .map_err(|e| self.reject(e))?;
        drop(ring);

        debug!(path, key, position, worker = %worker, "routed request");
        metrics::counter!("router_requests_total", "worker" => worker.id.clone()).increment(1);
        Ok(worker)
    }

    /// Route `path` and resolve the owning worker's endpoint.
    ///
    /// Resolver failures ([`Error::EndpointNotFound`]) are surfaced as is,
    /// without retrying another worker.
    pub fn dispatch(&self, path: &str) -> Result<RouteDecision> {
        let worker = self.route(path)?;
        let endpoint = self
            .resolver
            .resolve(&worker.hostname)
            .map_err(|e| self.reject(e))?;
        let path = registry::normalize(path).to_string();
        Ok(RouteDecision {
            url: endpoint.url_for(&path),
            path,
            worker: worker.as_ref().clone(),
            endpoint,
        })
    }

    /// Consistent snapshot of every worker and its positions.
    pub fn list_membership(&self) -> Membership {
        self.ring.read().membership()
    }

    pub fn paths(&self) -> &RequestPathRegistry {
        &self.paths
    }

    pub fn resolver(&self) -> &R {
        &self.resolver
    }

    pub fn ring(&self) -> &SharedRing {
        &self.ring
    }

    fn reject(&self, error: Error) -> Error {
        metrics::counter!("router_rejections_total", "reason" => error.kind()).increment(1);
        error
    }
}
