//! Administrative surface of the balancer.
//!
//! [`Balancer`] bundles a ring, its membership manager and a router, and
//! speaks in structured request/response payloads. Mapping these to a
//! transport (HTTP status codes, JSON bodies) is left to the caller.

use std::collections::BTreeMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::config::RingConfig;
use crate::error::{Error, Result};
use crate::membership::MembershipManager;
use crate::network::{EndpointResolver, StaticResolver};
use crate::registry::RequestPathRegistry;
use crate::ring::{HashRing, Placement, Removal, SharedRing};
use crate::router::{RouteDecision, Router};

/// Outcome label carried by every response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Successful,
    Failure,
}

/// Error as reported to administrative clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ErrorReport {
    pub kind: &'static str,
    pub message: String,
}

impl From<&Error> for ErrorReport {
    fn from(e: &Error) -> Self {
        Self {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// Request to add `n` workers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddWorkersRequest {
    pub n: usize,
    pub worker_ids: Vec<String>,
    #[serde(default)]
    pub hostnames: Vec<String>,
}

impl AddWorkersRequest {
    pub fn validate(&self) -> Result<()> {
        if self.worker_ids.len() != self.n {
            return Err(Error::InvalidRequest(format!(
                "n = {} but {} worker ids given",
                self.n,
                self.worker_ids.len()
            )));
        }
        Ok(())
    }
}

/// Request to remove `n` workers by hostname.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveWorkersRequest {
    pub n: usize,
    pub hostnames: Vec<String>,
}

impl RemoveWorkersRequest {
    pub fn validate(&self) -> Result<()> {
        if self.hostnames.len() != self.n {
            return Err(Error::InvalidRequest(format!(
                "n = {} but {} hostnames given",
                self.n,
                self.hostnames.len()
            )));
        }
        Ok(())
    }
}

/// A worker and the ring positions it was given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WorkerFootprint {
    pub id: String,
    pub hostname: String,
    pub positions: Vec<u64>,
}

impl From<&Placement> for WorkerFootprint {
    fn from(p: &Placement) -> Self {
        Self {
            id: p.worker.id.clone(),
            hostname: p.worker.hostname.clone(),
            positions: p.positions.clone(),
        }
    }
}

impl From<&Removal> for WorkerFootprint {
    fn from(r: &Removal) -> Self {
        Self {
            id: r.worker.id.clone(),
            hostname: r.worker.hostname.clone(),
            positions: r.positions.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddWorkersResponse {
    pub status: Status,
    /// Workers added before the batch stopped.
    pub added: usize,
    pub total_workers: usize,
    pub results: Vec<WorkerFootprint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemoveWorkersResponse {
    pub status: Status,
    /// Populated ring positions after the batch.
    pub n: usize,
    pub total_workers: usize,
    /// Removed workers and the positions they gave up.
    pub results: Vec<WorkerFootprint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

/// Status report: every worker, labelled `"<id> (<hostname>)"`, with its
/// positions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MembershipReport {
    pub status: Status,
    pub n: usize,
    pub replicas: BTreeMap<String, Vec<u64>>,
}

fn status_of(error: &Option<Error>) -> Status {
    match error {
        None => Status::Successful,
        Some(_) => Status::Failure,
    }
}

/// Ring, membership manager and router wired to the same ring.
#[derive(Debug)]
pub struct Balancer<R = StaticResolver> {
    membership: MembershipManager,
    router: Router<R>,
}

impl Balancer<StaticResolver> {
    /// Build a balancer from configuration and seed its workers.
    ///
    /// Only an invalid keyspace is an error; bad seed entries are skipped.
    pub fn from_config(config: &RingConfig) -> Result<Self> {
        let ring = HashRing::with_config(config.keyspace()?, config.strategy);
        let balancer = Self::new(ring, config.path_registry(), config.resolver());
        let seeded = balancer.membership.seed(&config.workers);
        info!(
            slots = config.slots,
            strategy = %config.strategy,
            seeded,
            "balancer ready"
        );
        Ok(balancer)
    }
}

impl<R: EndpointResolver> Balancer<R> {
    pub fn new(ring: HashRing, paths: RequestPathRegistry, resolver: R) -> Self {
        let ring: SharedRing = Arc::new(RwLock::new(ring));
        Self {
            membership: MembershipManager::new(Arc::clone(&ring)),
            router: Router::new(ring, paths, resolver),
        }
    }

    pub fn membership(&self) -> &MembershipManager {
        &self.membership
    }

    pub fn router(&self) -> &Router<R> {
        &self.router
    }

    /// Add a batch of workers.
    ///
    /// A malformed request is an error with nothing applied; a failure
    /// inside the batch is reported in the response alongside the workers
    /// added before it.
    pub fn add_workers(&self, request: &AddWorkersRequest) -> Result<AddWorkersResponse> {
        request.validate()?;
        let outcome = self
            .membership
            .add_workers(&request.worker_ids, &request.hostnames)?;
        Ok(AddWorkersResponse {
            status: status_of(&outcome.failure),
            added: outcome.completed.len(),
            total_workers: self.membership.worker_count(),
            results: outcome.completed.iter().map(WorkerFootprint::from).collect(),
            error: outcome.failure.as_ref().map(ErrorReport::from),
        })
    }

    /// Remove a batch of workers by hostname.
    pub fn remove_workers(&self, request: &RemoveWorkersRequest) -> Result<RemoveWorkersResponse> {
        request.validate()?;
        let outcome = self.membership.remove_workers(&request.hostnames);
        let (positions, workers) = {
            let ring = self.membership.ring().read();
            (ring.position_count(), ring.worker_count())
        };
        Ok(RemoveWorkersResponse {
            status: status_of(&outcome.failure),
            n: positions,
            total_workers: workers,
            results: outcome.completed.iter().map(WorkerFootprint::from).collect(),
            error: outcome.failure.as_ref().map(ErrorReport::from),
        })
    }

    pub fn status(&self) -> MembershipReport {
        let membership = self.router.list_membership();
        MembershipReport {
            status: Status::Successful,
            n: membership.worker_count(),
            replicas: membership
                .iter()
                .map(|(worker, positions)| (worker.label(), positions.to_vec()))
                .collect(),
        }
    }

    pub fn route(&self, path: &str) -> Result<RouteDecision> {
        self.router.dispatch(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn balancer() -> Balancer {
        let config = RingConfig::from_json(
            r#"{
                "workers": [
                    {"id": "s1", "hostname": "server1"},
                    {"id": "s2", "hostname": "server2"}
                ],
                "endpoints": [
                    {"hostname": "server1", "address": "10.0.0.11", "port": 5051},
                    {"hostname": "server2", "address": "10.0.0.12", "port": 5052}
                ]
            }"#,
        )
        .unwrap();
        Balancer::from_config(&config).unwrap()
    }

    #[test]
    fn test_status_report() {
        let report = balancer().status();
        assert_eq!(report.status, Status::Successful);
        assert_eq!(report.n, 2);
        assert_eq!(
            report.replicas["s1 (server1)"],
            vec![26, 29, 32, 35, 38, 41, 44, 47, 50]
        );
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["status"], "successful");
    }

    #[test]
    fn test_add_request_count_mismatch() {
        let b = balancer();
        let request = AddWorkersRequest {
            n: 2,
            worker_ids: vec!["s3".into()],
            hostnames: vec![],
        };
        assert!(matches!(b.add_workers(&request), Err(Error::InvalidRequest(_))));
        assert_eq!(b.membership().worker_count(), 2);
    }

    #[test]
    fn test_add_reports_partial_failure() {
        let b = balancer();
        let request = AddWorkersRequest {
            n: 3,
            worker_ids: vec!["s3".into(), "s1".into(), "s5".into()],
            hostnames: vec!["server3".into()],
        };
        let response = b.add_workers(&request).unwrap();
        assert_eq!(response.status, Status::Failure);
        assert_eq!(response.added, 1);
        assert_eq!(response.total_workers, 3);
        assert_eq!(response.error.unwrap().kind, "duplicate_worker");
    }

    #[test]
    fn test_remove_workers() {
        let b = balancer();
        let response = b
            .remove_workers(&RemoveWorkersRequest {
                n: 1,
                hostnames: vec!["server2".into()],
            })
            .unwrap();
        assert_eq!(response.status, Status::Successful);
        assert_eq!(response.n, 9);
        assert_eq!(response.results[0].id, "s2");
        assert!(response.error.is_none());
    }

    #[test]
    fn test_remove_request_count_mismatch() {
        let b = balancer();
        let request = RemoveWorkersRequest {
            n: 3,
            hostnames: vec!["server1".into()],
        };
        assert!(matches!(b.remove_workers(&request), Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_route_decision() {
        let b = balancer();
        let hash = {
            let ring = b.membership().ring().read();
            ring.strategy()
                .request_hash(crate::hash::request_key("home"), ring.keyspace())
        };
        // s1 holds 26..=50 and s2 27..=51 in steps of 3; every other hash
        // lands on, or wraps to, an s1 position
        let expected = if (27..=51).contains(&hash) && (hash - 27) % 3 == 0 {
            "s2"
        } else {
            "s1"
        };

        let decision = b.route("home").unwrap();
        assert_eq!(decision.worker.id, expected);
        let url = match expected {
            "s1" => "http://10.0.0.11:5051/home",
            _ => "http://10.0.0.12:5052/home",
        };
        assert_eq!(decision.url, url);
    }
}
