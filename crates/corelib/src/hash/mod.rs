//! Hash strategies for placing requests and virtual nodes on the ring.
//!
//! Two strategies are supported and chosen once per ring:
//! - [`HashStrategy::Polynomial`]: cheap closed-form polynomial
//! - [`HashStrategy::Digest`]: BLAKE3 digest reduced into the keyspace
//!
//! Switching strategies invalidates every stored position, so a ring keeps
//! the strategy it was built with for its whole lifetime.

pub mod digest;
pub mod polynomial;
pub mod traits;

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use siphasher::sip::SipHasher13;

pub use digest::DigestHasher;
pub use polynomial::PolynomialHasher;
pub use traits::SlotHasher;

use crate::ring::Keyspace;

/// Hash strategy selected at ring construction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HashStrategy {
    #[default]
    Polynomial,
    Digest,
}

impl HashStrategy {
    fn hasher(&self) -> &'static dyn SlotHasher {
        match self {
            HashStrategy::Polynomial => &PolynomialHasher,
            HashStrategy::Digest => &DigestHasher,
        }
    }

    /// Ring position of an integer request key.
    #[inline]
    pub fn request_hash(&self, key: u64, keyspace: Keyspace) -> u64 {
        self.hasher().request_slot(key, keyspace)
    }

    /// Ring position of virtual node `replica` of a worker.
    #[inline]
    pub fn virtual_hash(
        &self,
        worker_id: &str,
        numeric_id: u64,
        replica: u32,
        keyspace: Keyspace,
    ) -> u64 {
        self.hasher()
            .virtual_slot(worker_id, numeric_id, replica, keyspace)
    }

    /// Returns the name of the underlying hasher.
    pub fn name(&self) -> &'static str {
        self.hasher().name()
    }
}

impl fmt::Display for HashStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HashStrategy::Polynomial => f.write_str("polynomial"),
            HashStrategy::Digest => f.write_str("digest"),
        }
    }
}

/// Integer request key for a request path.
///
/// SipHash-1-3 with zero keys, so the value is stable across processes
/// (unlike `std`'s randomly seeded `DefaultHasher`).
pub fn request_key(path: &str) -> u64 {
    let mut hasher = SipHasher13::new();
    path.hash(&mut hasher);
    hasher.finish()
}
