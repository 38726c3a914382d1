//! Membership changes on a shared ring.
//!
//! [`MembershipManager`] is the only writer of a [`SharedRing`]. Each
//! operation holds the ring's write lock from its first check to its last
//! insert, so concurrent lookups see either the old or the new ring, never a
//! half-applied change.

use std::sync::Arc;

use tracing::{info, warn};

use crate::config::SeedWorker;
use crate::error::{Error, Result};
use crate::ring::{HashRing, Placement, Removal, SharedRing};
use crate::worker::WorkerIdentity;

/// Prefix for hostnames filled in when a batch add lists fewer hostnames
/// than ids.
pub const UNNAMED_HOST_PREFIX: &str = "unnamed_";

/// Result of a batch operation.
///
/// Batches stop at the first failure. Items before it stay applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchOutcome<T> {
    /// Results for every item applied, in order.
    pub completed: Vec<T>,
    /// The error that stopped the batch, if any.
    pub failure: Option<Error>,
}

impl<T> BatchOutcome<T> {
    fn new() -> Self {
        Self {
            completed: Vec::new(),
            failure: None,
        }
    }

    pub fn is_complete(&self) -> bool {
        self.failure.is_none()
    }

    /// `Ok(completed)` when every item succeeded, otherwise the failure.
    pub fn into_result(self) -> Result<Vec<T>> {
        match self.failure {
            None => Ok(self.completed),
            Some(e) => Err(e),
        }
    }
}

/// Adds, removes and updates workers on a shared ring.
#[derive(Debug, Clone)]
pub struct MembershipManager {
    ring: SharedRing,
}

impl MembershipManager {
    pub fn new(ring: SharedRing) -> Self {
        Self { ring }
    }

    /// The ring this manager mutates.
    pub fn ring(&self) -> &SharedRing {
        &self.ring
    }

    /// Add worker `id` at `hostname` with all of its virtual nodes.
    ///
    /// # Errors
    ///
    /// - [`Error::InvalidWorkerId`] if `id` has no numeric form
    /// - [`Error::DuplicateWorker`] if `id` is already in the ring
    ///
    /// The ring is untouched on error.
    pub fn add_worker(&self, id: &str, hostname: &str) -> Result<Placement> {
        let worker = WorkerIdentity::new(id, hostname)?;
        let mut ring = self.ring.write();
        let placement = ring.add_worker(worker).inspect_err(|e| {
            warn!(worker_id = id, hostname, error = %e, "rejected worker");
        })?;
        info!(
            worker_id = id,
            hostname,
            positions = placement.positions.len(),
            collisions = placement.displaced.len(),
            total_workers = ring.worker_count(),
            "added worker"
        );
        record_ring_gauges(&ring);
        Ok(placement)
    }

    /// Remove the worker running at `hostname`.
    ///
    /// Fails with [`Error::WorkerNotFound`] without touching the ring if no
    /// worker uses that hostname.
    pub fn remove_worker(&self, hostname: &str) -> Result<Removal> {
        let mut ring = self.ring.write();
        let removal = ring.remove_worker(hostname).inspect_err(|e| {
            warn!(hostname, error = %e, "cannot remove worker");
        })?;
        info!(
            worker_id = %removal.worker.id,
            hostname,
            positions = removal.positions.len(),
            total_workers = ring.worker_count(),
            "removed worker"
        );
        record_ring_gauges(&ring);
        Ok(removal)
    }

    /// Remove worker `id`, whatever hostname it runs at.
    ///
    /// Fails with [`Error::WorkerNotFound`] without touching the ring if `id`
    /// is not registered.
    pub fn remove_worker_by_id(&self, id: &str) -> Result<Removal> {
        let mut ring = self.ring.write();
        let removal = ring.remove_worker_by_id(id).inspect_err(|e| {
            warn!(worker_id = id, error = %e, "cannot remove worker");
        })?;
        info!(
            worker_id = id,
            hostname = %removal.worker.hostname,
            positions = removal.positions.len(),
            total_workers = ring.worker_count(),
            "removed worker"
        );
        record_ring_gauges(&ring);
        Ok(removal)
    }

    /// Rebuild the ring footprint of worker `id`, now at `hostname`.
    ///
    /// Removes every position of the worker and re-adds it from scratch under
    /// one write lock. Positions it had lost to collisions may come back,
    /// and positions it wins now may be taken from other workers.
    ///
    /// Fails with [`Error::WorkerNotFound`] if `id` is not registered.
    pub fn update_worker(&self, id: &str, hostname: &str) -> Result<Placement> {
        let worker = WorkerIdentity::new(id, hostname)?;
        let mut ring = self.ring.write();
        let removal = ring.remove_worker_by_id(id).inspect_err(|e| {
            warn!(worker_id = id, error = %e, "cannot update worker");
        })?;
        let placement = ring.add_worker(worker)?;
        info!(
            worker_id = id,
            old_hostname = %removal.worker.hostname,
            new_hostname = hostname,
            positions = placement.positions.len(),
            "updated worker"
        );
        record_ring_gauges(&ring);
        Ok(placement)
    }

    /// Add several workers in order, stopping at the first failure.
    ///
    /// `hostnames` may be shorter than `ids`; missing entries become
    /// `unnamed_<index>`. More hostnames than ids is
    /// [`Error::InvalidRequest`] and nothing is applied.
    pub fn add_workers(
        &self,
        ids: &[String],
        hostnames: &[String],
    ) -> Result<BatchOutcome<Placement>> {
        if hostnames.len() > ids.len() {
            return Err(Error::InvalidRequest(format!(
                "{} hostnames given for {} worker ids",
                hostnames.len(),
                ids.len()
            )));
        }

        let mut outcome = BatchOutcome::new();
        for (index, id) in ids.iter().enumerate() {
            let hostname = hostnames
                .get(index)
                .cloned()
                .unwrap_or_else(|| format!("{UNNAMED_HOST_PREFIX}{index}"));
            match self.add_worker(id, &hostname) {
                Ok(placement) => outcome.completed.push(placement),
                Err(e) => {
                    outcome.failure = Some(e);
                    break;
                }
            }
        }
        Ok(outcome)
    }

    /// Remove several workers by hostname, stopping at the first failure.
    pub fn remove_workers(&self, hostnames: &[String]) -> BatchOutcome<Removal> {
        let mut outcome = BatchOutcome::new();
        for hostname in hostnames {
            match self.remove_worker(hostname) {
                Ok(removal) => outcome.completed.push(removal),
                Err(e) => {
                    outcome.failure = Some(e);
                    break;
                }
            }
        }
        outcome
    }

    /// Pre-populate the ring from seed entries.
    ///
    /// Unlike the batch operations, a bad seed entry is logged and skipped.
    /// Returns the number of workers added.
    pub fn seed(&self, workers: &[SeedWorker]) -> usize {
        let mut added = 0;
        for seed in workers {
            match self.add_worker(&seed.id, &seed.hostname) {
                Ok(_) => added += 1,
                Err(e) => warn!(
                    worker_id = %seed.id,
                    hostname = %seed.hostname,
                    error = %e,
                    "skipping seed worker"
                ),
            }
        }
        added
    }

    pub fn worker_count(&self) -> usize {
        self.ring.read().worker_count()
    }

    /// Registered workers, ordered by id.
    pub fn workers(&self) -> Vec<Arc<WorkerIdentity>> {
        self.ring.read().workers()
    }
}

fn record_ring_gauges(ring: &HashRing) {
    metrics::gauge!("ring_workers").set(ring.worker_count() as f64);
    metrics::gauge!("ring_positions").set(ring.position_count() as f64);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::RwLock;

    fn manager() -> MembershipManager {
        MembershipManager::new(Arc::new(RwLock::new(HashRing::new())))
    }

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_add_and_remove() {
        let m = manager();
        m.add_worker("s1", "hostA").unwrap();
        m.add_worker("s2", "hostB").unwrap();
        assert_eq!(m.worker_count(), 2);

        let removal = m.remove_worker("hostA").unwrap();
        assert_eq!(removal.worker.id, "s1");
        assert_eq!(m.worker_count(), 1);
    }

    #[test]
    fn test_remove_by_id_with_shared_hostname() {
        let m = manager();
        m.add_worker("s1", "shared").unwrap();
        m.add_worker("s2", "shared").unwrap();

        let removal = m.remove_worker_by_id("s2").unwrap();
        assert_eq!(removal.worker.id, "s2");
        let ring = m.ring().read();
        assert!(ring.contains_worker("s1"));
        assert!(!ring.contains_worker("s2"));
        assert_eq!(ring.position_count(), 9);
        drop(ring);

        assert_eq!(
            m.remove_worker_by_id("s2").unwrap_err(),
            Error::WorkerNotFound("s2".to_string())
        );
    }

    #[test]
    fn test_invalid_id_leaves_ring_untouched() {
        let m = manager();
        let err = m.add_worker("server", "hostA").unwrap_err();
        assert_eq!(err, Error::InvalidWorkerId("server".to_string()));
        assert!(m.ring().read().is_empty());
    }

    #[test]
    fn test_update_moves_worker() {
        let m = manager();
        m.add_worker("s1", "hostA").unwrap();
        let placement = m.update_worker("s1", "hostA2").unwrap();
        assert_eq!(placement.worker.hostname, "hostA2");
        assert_eq!(placement.positions.len(), 9);
        assert_eq!(m.worker_count(), 1);
        assert!(m.ring().read().find_by_hostname("hostA").is_none());
    }

    #[test]
    fn test_update_unknown_worker() {
        let m = manager();
        m.add_worker("s1", "hostA").unwrap();
        let before = m.ring().read().clone();
        assert_eq!(
            m.update_worker("s9", "hostZ").unwrap_err(),
            Error::WorkerNotFound("s9".to_string())
        );
        assert_eq!(*m.ring().read(), before);
    }

    #[test]
    fn test_update_restores_lost_positions() {
        let m = manager();
        m.add_worker("s1", "hostA").unwrap();
        m.add_worker("s4", "hostD").unwrap();
        assert_eq!(m.ring().read().entries_for_owner("s1"), vec![26]);

        // Re-adding s1 makes it the later writer on the shared slots.
        let placement = m.update_worker("s1", "hostA").unwrap();
        assert_eq!(placement.positions.len(), 9);
        assert_eq!(m.ring().read().entries_for_owner("s4"), vec![53]);
    }

    #[test]
    fn test_add_workers_pads_hostnames() {
        let m = manager();
        let outcome = m
            .add_workers(&strings(&["s1", "s2", "s3"]), &strings(&["hostA"]))
            .unwrap();
        assert!(outcome.is_complete());
        let hosts: Vec<&str> = outcome
            .completed
            .iter()
            .map(|p| p.worker.hostname.as_str())
            .collect();
        assert_eq!(hosts, vec!["hostA", "unnamed_1", "unnamed_2"]);
    }

    #[test]
    fn test_add_workers_rejects_extra_hostnames() {
        let m = manager();
        let err = m
            .add_workers(&strings(&["s1"]), &strings(&["hostA", "hostB"]))
            .unwrap_err();
        assert!(matches!(err, Error::InvalidRequest(_)));
        assert_eq!(m.worker_count(), 0);
    }

    #[test]
    fn test_add_workers_stops_at_first_failure() {
        let m = manager();
        let outcome = m
            .add_workers(
                &strings(&["s1", "s1", "s3"]),
                &strings(&["hostA", "hostB", "hostC"]),
            )
            .unwrap();
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.failure, Some(Error::DuplicateWorker("s1".to_string())));
        assert!(!m.ring().read().contains_worker("s3"));
        assert!(outcome.into_result().is_err());
    }

    #[test]
    fn test_remove_workers_stops_at_first_failure() {
        let m = manager();
        m.add_workers(&strings(&["s1", "s2", "s3"]), &strings(&["a", "b", "c"]))
            .unwrap();
        let outcome = m.remove_workers(&strings(&["a", "zz", "c"]));
        assert_eq!(outcome.completed.len(), 1);
        assert_eq!(outcome.failure, Some(Error::WorkerNotFound("zz".to_string())));
        // "c" was never attempted and no rollback of "a" happened.
        assert!(m.ring().read().contains_worker("s3"));
        assert!(!m.ring().read().contains_worker("s1"));
    }

    #[test]
    fn test_seed_skips_bad_entries() {
        let m = manager();
        let seeds: Vec<SeedWorker> = [("s1", "a"), ("bad", "b"), ("s1", "c"), ("s2", "d")]
            .iter()
            .map(|(id, hostname)| SeedWorker {
                id: id.to_string(),
                hostname: hostname.to_string(),
            })
            .collect();
        assert_eq!(m.seed(&seeds), 2);
        assert_eq!(m.worker_count(), 2);
    }
}
