//! Deterministic polynomial hasher.
//!
//! - request: `(3 * key^2 + 289) mod S`
//! - virtual node: `(numeric_id + 3 * replica + 25) mod S`
//!
//! Cheap and reproducible. Not uniform for adversarial keys.

use crate::hash::traits::SlotHasher;
use crate::ring::Keyspace;

/// Polynomial slot hasher.
#[derive(Clone, Copy, Debug, Default)]
pub struct PolynomialHasher;

impl SlotHasher for PolynomialHasher {
    fn request_slot(&self, key: u64, keyspace: Keyspace) -> u64 {
        // Reducing first keeps the square inside u128; the residue is unchanged.
        let k = keyspace.wrap(key as u128) as u128;
        keyspace.wrap(3 * k * k + 289)
    }

    fn virtual_slot(
        &self,
        _worker_id: &str,
        numeric_id: u64,
        replica: u32,
        keyspace: Keyspace,
    ) -> u64 {
        keyspace.wrap(numeric_id as u128 + 3 * replica as u128 + 25)
    }

    fn name(&self) -> &'static str {
        "PolynomialHasher"
    }
}
