//! Core hashing trait definitions.

use crate::ring::Keyspace;

/// A slot hasher places request keys and virtual nodes on the ring.
///
/// Hashers are pure and stateless: the same inputs always land on the same
/// position, so they can be shared across threads without synchronization.
pub trait SlotHasher: Send + Sync + 'static {
    /// Position of a request key.
    ///
    /// # Arguments
    ///
    /// * `key` - Integer request key (see [`request_key`](super::request_key))
    /// * `keyspace` - The ring's keyspace
    fn request_slot(&self, key: u64, keyspace: Keyspace) -> u64;

    /// Position of virtual node `replica` belonging to worker `worker_id`.
    ///
    /// `numeric_id` is the numeric form of `worker_id`; each hasher uses
    /// whichever of the two it is defined over.
    fn virtual_slot(
        &self,
        worker_id: &str,
        numeric_id: u64,
        replica: u32,
        keyspace: Keyspace,
    ) -> u64;

    /// Returns the name of this hasher.
    fn name(&self) -> &'static str;
}
