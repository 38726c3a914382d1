//! Keyspace of ring positions.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of slots on the ring.
pub const DEFAULT_SLOTS: u64 = 512;

/// The fixed-size keyspace `[0, slots)` that ring positions live in.
///
/// `slots` is a power of two; the number of virtual nodes each worker owns
/// is `log2(slots)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Keyspace {
    slots: u64,
}

impl Keyspace {
    /// Creates a keyspace with `slots` positions.
    ///
    /// Fails with [`Error::InvalidConfig`] unless `slots` is a power of two
    /// no smaller than 2.
    pub fn new(slots: u64) -> Result<Self> {
        if slots < 2 || !slots.is_power_of_two() {
            return Err(Error::InvalidConfig(format!(
                "slot count must be a power of two >= 2, got {slots}"
            )));
        }
        Ok(Self { slots })
    }

    /// Number of positions in the keyspace.
    #[inline]
    pub fn slots(&self) -> u64 {
        self.slots
    }

    /// Virtual nodes per worker: `log2(slots)`.
    #[inline]
    pub fn vnodes_per_worker(&self) -> u32 {
        self.slots.trailing_zeros()
    }

    /// Reduce an arbitrary value into `[0, slots)`.
    #[inline]
    pub fn wrap(&self, value: u128) -> u64 {
        (value % self.slots as u128) as u64
    }

    /// True if `position` lies inside the keyspace.
    #[inline]
    pub fn contains(&self, position: u64) -> bool {
        position < self.slots
    }
}

impl Default for Keyspace {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_keyspace() {
        let ks = Keyspace::default();
        assert_eq!(ks.slots(), 512);
        assert_eq!(ks.vnodes_per_worker(), 9);
    }

    #[test]
    fn test_rejects_non_power_of_two() {
        assert!(Keyspace::new(0).is_err());
        assert!(Keyspace::new(1).is_err());
        assert!(Keyspace::new(500).is_err());
        assert_eq!(Keyspace::new(1024).unwrap().vnodes_per_worker(), 10);
    }

    #[test]
    fn test_wrap() {
        let ks = Keyspace::new(8).unwrap();
        assert_eq!(ks.wrap(7), 7);
        assert_eq!(ks.wrap(8), 0);
        assert_eq!(ks.wrap(u128::MAX), 7);
        assert!(ks.contains(7));
        assert!(!ks.contains(8));
    }
}
