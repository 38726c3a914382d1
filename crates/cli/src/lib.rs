//! `ringctl`: drive a consistent-hashing balancer from the command line.
//!
//! Every invocation builds the ring from the seed configuration, applies one
//! command and prints the result as JSON:
//! - Membership status
//! - Routing paths to workers
//! - Adding/removing workers
//! - Watching worker liveness over TCP

pub mod commands;
pub mod config;
pub mod probe;

pub use commands::{Command, CommandResult};
pub use config::CliConfig;
pub use probe::TcpProbe;
