//! Core library for consistent-hash request routing.
//!
//! This crate provides the pieces of a consistent-hashing load balancer:
//! - Hash strategies placing requests and virtual nodes on the ring
//! - The ring itself, with successor lookup and wraparound
//! - Worker identities and virtual node placement
//! - Membership changes under a single-writer discipline
//! - The router, its path registry and the endpoint resolver contract
//! - Seed configuration and the administrative request/response shapes

pub mod admin;
pub mod config;
pub mod error;
pub mod hash;
pub mod membership;
pub mod network;
pub mod registry;
pub mod ring;
pub mod router;
pub mod topology;
pub mod vnode;
pub mod worker;

pub use admin::Balancer;
pub use config::RingConfig;
pub use error::{Error, Result};
pub use hash::HashStrategy;
pub use membership::{BatchOutcome, MembershipManager};
pub use network::{Endpoint, EndpointResolver, StaticResolver};
pub use registry::RequestPathRegistry;
pub use ring::{HashRing, Keyspace, Ring, RingBuilder, SharedRing};
pub use router::{RouteDecision, Router};
pub use topology::Membership;
pub use vnode::VirtualNode;
pub use worker::WorkerIdentity;
