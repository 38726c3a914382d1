//! Digest hasher built on BLAKE3.
//!
//! - request: `blake3(key.to_string()) mod S`
//! - virtual node: `blake3("<worker_id>-<replica>") mod S`
//!
//! The first 128 bits of the digest are reduced into the keyspace.

use crate::hash::traits::SlotHasher;
use crate::ring::Keyspace;

/// Digest slot hasher.
#[derive(Clone, Copy, Debug, Default)]
pub struct DigestHasher;

impl DigestHasher {
    fn digest_slot(input: &str, keyspace: Keyspace) -> u64 {
        let hash = blake3::hash(input.as_bytes());
        let mut head = [0u8; 16];
        head.copy_from_slice(&hash.as_bytes()[..16]);
        keyspace.wrap(u128::from_be_bytes(head))
    }
}

impl SlotHasher for DigestHasher {
    fn request_slot(&self, key: u64, keyspace: Keyspace) -> u64 {
        Self::digest_slot(&key.to_string(), keyspace)
    }

    fn virtual_slot(
        &self,
        worker_id: &str,
        _numeric_id: u64,
        replica: u32,
        keyspace: Keyspace,
    ) -> u64 {
        Self::digest_slot(&format!("{worker_id}-{replica}"), keyspace)
    }

    fn name(&self) -> &'static str {
        "DigestHasher"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slots_in_range() {
        let ks = Keyspace::new(64).unwrap();
        let h = DigestHasher;
        for key in 0..1_000u64 {
            assert!(ks.contains(h.request_slot(key, ks)));
        }
        for j in 0..6 {
            assert!(ks.contains(h.virtual_slot("s7", 7, j, ks)));
        }
    }

    #[test]
    fn test_matches_raw_digest() {
        let ks = Keyspace::default();
        let raw = blake3::hash(b"s1-0");
        let mut head = [0u8; 16];
        head.copy_from_slice(&raw.as_bytes()[..16]);
        let expected = (u128::from_be_bytes(head) % 512) as u64;
        assert_eq!(DigestHasher.virtual_slot("s1", 1, 0, ks), expected);
    }

    #[test]
    fn test_uses_string_id_not_numeric() {
        // "s1" and "w1" share a numeric id but hash differently.
        let ks = Keyspace::new(1 << 16).unwrap();
        let a: Vec<u64> = (0..16).map(|j| DigestHasher.virtual_slot("s1", 1, j, ks)).collect();
        let b: Vec<u64> = (0..16).map(|j| DigestHasher.virtual_slot("w1", 1, j, ks)).collect();
        assert_ne!(a, b);
    }
}
