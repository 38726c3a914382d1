//! Hash ring data structure.
//!
//! Holds a `BTreeMap<position, worker>` for successor lookups plus a registry
//! of every worker added to the ring.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::{Error, Result};
use crate::hash::HashStrategy;
use crate::ring::Keyspace;
use crate::topology::Membership;
use crate::vnode::VirtualNode;
use crate::worker::WorkerIdentity;

/// Outcome of adding a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub worker: Arc<WorkerIdentity>,
    /// Positions the worker holds after the insert, ascending.
    pub positions: Vec<u64>,
    /// Positions taken over from other workers, with their previous owner.
    pub displaced: Vec<(u64, Arc<WorkerIdentity>)>,
}

/// Outcome of removing a worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removal {
    pub worker: Arc<WorkerIdentity>,
    /// Positions that were deleted, ascending.
    pub positions: Vec<u64>,
}

/// Consistent hash ring.
///
/// Positions are unique; inserting an occupied position overwrites its
/// owner. The hash strategy and keyspace are fixed at construction.
///
/// This type is not synchronized. Share it through
/// [`SharedRing`](crate::ring::SharedRing).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashRing {
    keyspace: Keyspace,
    strategy: HashStrategy,
    /// Ring position -> owning worker.
    entries: BTreeMap<u64, Arc<WorkerIdentity>>,
    /// Worker id -> worker, for every worker added and not yet removed.
    workers: BTreeMap<String, Arc<WorkerIdentity>>,
}

impl HashRing {
    /// Empty ring with 512 slots and the polynomial strategy.
    pub fn new() -> Self {
        Self::with_config(Keyspace::default(), HashStrategy::default())
    }

    pub fn with_config(keyspace: Keyspace, strategy: HashStrategy) -> Self {
        Self {
            keyspace,
            strategy,
            entries: BTreeMap::new(),
            workers: BTreeMap::new(),
        }
    }

    pub fn keyspace(&self) -> Keyspace {
        self.keyspace
    }

    pub fn strategy(&self) -> HashStrategy {
        self.strategy
    }

    pub fn vnodes_per_worker(&self) -> u32 {
        self.keyspace.vnodes_per_worker()
    }

    // ------------------------------------------------------------------
    // Position-level operations
    // ------------------------------------------------------------------

    /// Insert or overwrite the owner of `position`.
    ///
    /// `position` is reduced into the keyspace. Returns the previous owner.
    pub fn insert(
        &mut self,
        position: u64,
        owner: Arc<WorkerIdentity>,
    ) -> Option<Arc<WorkerIdentity>> {
        let position = self.keyspace.wrap(position as u128);
        self.entries.insert(position, owner)
    }

    /// Remove `position` if present. Absent positions are a no-op.
    ///
    /// `position` is reduced into the keyspace, as in [`insert`](Self::insert).
    pub fn delete(&mut self, position: u64) -> Option<Arc<WorkerIdentity>> {
        let position = self.keyspace.wrap(position as u128);
        self.entries.remove(&position)
    }

    /// Owner of the smallest position `>= hash`, wrapping to the first entry.
    ///
    /// Fails with [`Error::EmptyRing`] only when the ring has no positions.
    pub fn successor(&self, hash: u64) -> Result<&Arc<WorkerIdentity>> {
        self.entries
            .range(hash..)
            .next()
            .or_else(|| self.entries.iter().next())
            .map(|(_, owner)| owner)
            .ok_or(Error::EmptyRing)
    }

    /// Owner of the position a request key hashes to.
    pub fn lookup(&self, key: u64) -> Result<&Arc<WorkerIdentity>> {
        self.successor(self.strategy.request_hash(key, self.keyspace))
    }

    /// Positions currently owned by worker `worker_id`, ascending.
    pub fn entries_for_owner(&self, worker_id: &str) -> Vec<u64> {
        self.entries
            .iter()
            .filter(|(_, owner)| owner.id == worker_id)
            .map(|(position, _)| *position)
            .collect()
    }

    pub fn owner_at(&self, position: u64) -> Option<&Arc<WorkerIdentity>> {
        self.entries.get(&position)
    }

    /// All `(position, owner)` pairs in ascending position order.
    pub fn entries(&self) -> impl Iterator<Item = (u64, &Arc<WorkerIdentity>)> + '_ {
        self.entries.iter().map(|(position, owner)| (*position, owner))
    }

    // ------------------------------------------------------------------
    // Worker-level operations
    // ------------------------------------------------------------------

    /// Add a worker and all of its virtual nodes.
    ///
    /// A worker whose id is already registered is rejected with
    /// [`Error::DuplicateWorker`] before anything is inserted.
    pub fn add_worker(&mut self, worker: WorkerIdentity) -> Result<Placement> {
        if self.workers.contains_key(&worker.id) {
            return Err(Error::DuplicateWorker(worker.id));
        }

        let owner = Arc::new(worker);
        let mut displaced = Vec::new();
        for vnode in VirtualNode::placements(&owner, self.strategy, self.keyspace) {
            if let Some(previous) = self.insert(vnode.position, Arc::clone(&owner)) {
                if previous.id != owner.id {
                    debug!(
                        position = vnode.position,
                        winner = %owner,
                        loser = %previous,
                        "virtual node collision"
                    );
                    displaced.push((vnode.position, previous));
                }
            }
        }
        self.workers.insert(owner.id.clone(), Arc::clone(&owner));

        Ok(Placement {
            positions: self.entries_for_owner(&owner.id),
            worker: owner,
            displaced,
        })
    }

    /// Remove the worker registered under `hostname` and all of its positions.
    ///
    /// If several workers share a hostname, the one with the smallest id goes.
    pub fn remove_worker(&mut self, hostname: &str) -> Result<Removal> {
        let worker_id = self
            .find_by_hostname(hostname)
            .map(|worker| worker.id.clone())
            .ok_or_else(|| Error::WorkerNotFound(hostname.to_string()))?;
        self.evict(&worker_id)
            .ok_or_else(|| Error::WorkerNotFound(hostname.to_string()))
    }

    /// Remove the worker registered under `worker_id`.
    pub fn remove_worker_by_id(&mut self, worker_id: &str) -> Result<Removal> {
        self.evict(worker_id)
            .ok_or_else(|| Error::WorkerNotFound(worker_id.to_string()))
    }

    fn evict(&mut self, worker_id: &str) -> Option<Removal> {
        let worker = self.workers.remove(worker_id)?;
        let positions = self.entries_for_owner(worker_id);
        for position in &positions {
            self.delete(*position);
        }
        Some(Removal { worker, positions })
    }

    pub fn contains_worker(&self, worker_id: &str) -> bool {
        self.workers.contains_key(worker_id)
    }

    pub fn get_worker(&self, worker_id: &str) -> Option<&Arc<WorkerIdentity>> {
        self.workers.get(worker_id)
    }

    pub fn find_by_hostname(&self, hostname: &str) -> Option<&Arc<WorkerIdentity>> {
        self.workers.values().find(|worker| worker.hostname == hostname)
    }

    /// All registered workers, ordered by id.
    pub fn workers(&self) -> Vec<Arc<WorkerIdentity>> {
        self.workers.values().cloned().collect()
    }

    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    pub fn position_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every worker and the positions it holds.
    pub fn membership(&self) -> Membership {
        let mut membership = Membership::default();
        for worker in self.workers.values() {
            membership.register(worker.as_ref().clone());
        }
        for (position, owner) in &self.entries {
            membership.push(owner.as_ref(), *position);
        }
        membership
    }

    /// Returns the name of the hash strategy.
    pub fn strategy_name(&self) -> &'static str {
        self.strategy.name()
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for a [`HashRing`] with an initial set of workers.
#[derive(Debug, Default)]
pub struct RingBuilder {
    keyspace: Keyspace,
    strategy: HashStrategy,
    workers: Vec<(String, String)>,
}

impl RingBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_keyspace(mut self, keyspace: Keyspace) -> Self {
        self.keyspace = keyspace;
        self
    }

    pub fn with_strategy(mut self, strategy: HashStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Queue a worker; workers are added in the order given.
    pub fn add_worker(mut self, id: impl Into<String>, hostname: impl Into<String>) -> Self {
        self.workers.push((id.into(), hostname.into()));
        self
    }

    /// Build the ring, failing on the first invalid or duplicate worker.
    pub fn build(self) -> Result<HashRing> {
        let mut ring = HashRing::with_config(self.keyspace, self.strategy);
        for (id, hostname) in self.workers {
            ring.add_worker(WorkerIdentity::new(id, hostname)?)?;
        }
        Ok(ring)
    }
}
