//! Read-only views over the ring.
//!
//! [`Membership`] is a point-in-time snapshot of which worker holds which
//! positions, taken under a single read lock so it never mixes two
//! different membership changes.

use std::collections::BTreeMap;

use crate::worker::WorkerIdentity;

/// Snapshot mapping each worker to its ring positions (ascending).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Membership {
    workers: BTreeMap<WorkerIdentity, Vec<u64>>,
}

impl Membership {
    pub(crate) fn register(&mut self, worker: WorkerIdentity) {
        self.workers.entry(worker).or_default();
    }

    pub(crate) fn push(&mut self, worker: &WorkerIdentity, position: u64) {
        match self.workers.get_mut(worker) {
            Some(positions) => positions.push(position),
            None => {
                self.workers.insert(worker.clone(), vec![position]);
            }
        }
    }

    /// Number of workers in the snapshot.
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Total number of populated positions.
    pub fn position_count(&self) -> usize {
        self.workers.values().map(Vec::len).sum()
    }

    /// Positions held by the worker with id `worker_id`.
    pub fn positions_of(&self, worker_id: &str) -> Option<&[u64]> {
        self.workers
            .iter()
            .find(|(worker, _)| worker.id == worker_id)
            .map(|(_, positions)| positions.as_slice())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&WorkerIdentity, &[u64])> + '_ {
        self.workers
            .iter()
            .map(|(worker, positions)| (worker, positions.as_slice()))
    }

    pub fn into_inner(self) -> BTreeMap<WorkerIdentity, Vec<u64>> {
        self.workers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registered_worker_without_positions() {
        let mut m = Membership::default();
        let w = WorkerIdentity::new("s1", "a").unwrap();
        m.register(w.clone());
        assert_eq!(m.worker_count(), 1);
        assert_eq!(m.position_count(), 0);
        assert_eq!(m.positions_of("s1"), Some(&[][..]));

        m.push(&w, 4);
        m.push(&w, 9);
        assert_eq!(m.positions_of("s1"), Some(&[4, 9][..]));
        assert_eq!(m.positions_of("s2"), None);
    }
}
