//! Consistent hash ring implementation.
//!
//! The ring maps keyspace positions to workers and answers successor
//! queries with wraparound.

pub mod keyspace;
#[allow(clippy::module_inception)]
pub mod ring;

use std::sync::Arc;

use parking_lot::RwLock;

pub use keyspace::{Keyspace, DEFAULT_SLOTS};
pub use ring::{HashRing, Placement, Removal, RingBuilder};

/// Alias for the main ring type (used by lib.rs).
pub type Ring = HashRing;

/// Ring handle shared between the router and the membership manager.
///
/// Readers take the read lock per lookup; every compound membership change
/// holds the write lock from start to finish.
pub type SharedRing = Arc<RwLock<HashRing>>;
