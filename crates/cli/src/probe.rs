//! TCP connect probe.

use async_trait::async_trait;
use corelib::{EndpointResolver, WorkerIdentity};
use liveness::{Probe, ProbeOutcome};
use tokio::net::TcpStream;
use tracing::debug;

/// Considers a worker alive if its resolved endpoint accepts a TCP
/// connection. Hostnames the resolver does not know are unreachable.
pub struct TcpProbe<R> {
    resolver: R,
}

impl<R: EndpointResolver> TcpProbe<R> {
    pub fn new(resolver: R) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl<R: EndpointResolver + 'static> Probe for TcpProbe<R> {
    async fn probe(&self, worker: &WorkerIdentity) -> ProbeOutcome {
        let endpoint = match self.resolver.resolve(&worker.hostname) {
            Ok(endpoint) => endpoint,
            Err(e) => {
                debug!(worker = %worker, error = %e, "no endpoint to probe");
                return ProbeOutcome::Unreachable;
            }
        };
        match TcpStream::connect((endpoint.address.as_str(), endpoint.port)).await {
            Ok(_) => ProbeOutcome::Healthy,
            Err(e) => {
                debug!(worker = %worker, endpoint = %endpoint, error = %e, "probe failed");
                ProbeOutcome::Unreachable
            }
        }
    }
}
