//! Virtual node abstractions.
//!
//! Every worker occupies `log2(slots)` positions on the ring rather than a
//! single one, which smooths how the keyspace is split between workers.
//! Replica `j` of a worker sits at `virtual_hash(worker, j)`.
//!
//! Two virtual nodes may hash to the same position. The ring resolves this
//! with last-writer-wins: whichever worker is inserted later owns the slot,
//! and the earlier owner silently loses that virtual node.

use crate::hash::HashStrategy;
use crate::ring::Keyspace;
use crate::worker::WorkerIdentity;

/// A single virtual node of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct VirtualNode {
    /// Position on the ring.
    pub position: u64,
    /// Replica index in `[0, vnodes_per_worker)`.
    pub replica: u32,
}

impl VirtualNode {
    #[inline]
    pub fn new(position: u64, replica: u32) -> Self {
        Self { position, replica }
    }

    /// Compute the virtual node for replica `replica` of `worker`.
    pub fn from_index(
        worker: &WorkerIdentity,
        replica: u32,
        strategy: HashStrategy,
        keyspace: Keyspace,
    ) -> Self {
        let position = strategy.virtual_hash(&worker.id, worker.numeric_id, replica, keyspace);
        Self::new(position, replica)
    }

    /// All virtual nodes of `worker`, in replica order.
    ///
    /// Positions may repeat when a worker collides with itself; the ring
    /// then stores the position once.
    pub fn placements(
        worker: &WorkerIdentity,
        strategy: HashStrategy,
        keyspace: Keyspace,
    ) -> Vec<Self> {
        (0..keyspace.vnodes_per_worker())
            .map(|j| Self::from_index(worker, j, strategy, keyspace))
            .collect()
    }
}

impl std::fmt::Display for VirtualNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "VNode(position={}, replica={})", self.position, self.replica)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_polynomial_placements() {
        let worker = WorkerIdentity::new("s2", "hostB").unwrap();
        let vnodes = VirtualNode::placements(&worker, HashStrategy::Polynomial, Keyspace::default());
        assert_eq!(vnodes.len(), 9);
        let positions: Vec<u64> = vnodes.iter().map(|v| v.position).collect();
        assert_eq!(positions, vec![27, 30, 33, 36, 39, 42, 45, 48, 51]);
        assert_eq!(vnodes[4].replica, 4);
    }

    #[test]
    fn test_placement_count_follows_keyspace() {
        let worker = WorkerIdentity::new("s2", "hostB").unwrap();
        let ks = Keyspace::new(64).unwrap();
        assert_eq!(VirtualNode::placements(&worker, HashStrategy::Digest, ks).len(), 6);
    }

    #[test]
    fn test_small_keyspace_wraps() {
        // 26 % 4 and 29 % 4
        let worker = WorkerIdentity::new("s1", "hostA").unwrap();
        let ks = Keyspace::new(4).unwrap();
        let positions: Vec<u64> = VirtualNode::placements(&worker, HashStrategy::Polynomial, ks)
            .iter()
            .map(|v| v.position)
            .collect();
        assert_eq!(positions, vec![2, 1]);
    }
}
