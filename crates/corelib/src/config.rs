//! Ring and seed configuration.
//!
//! Configuration is a JSON document read once at startup:
//!
//! ```json
//! {
//!   "slots": 512,
//!   "strategy": "polynomial",
//!   "paths": ["home", "heartbeat", "server_status"],
//!   "workers": [{ "id": "s1", "hostname": "server1" }],
//!   "endpoints": [{ "hostname": "server1", "address": "10.0.0.11", "port": 5051 }]
//! }
//! ```
//!
//! Every field is optional. A missing or malformed file is not fatal: the
//! service starts with an empty ring and logs why.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::hash::HashStrategy;
use crate::network::{Endpoint, StaticResolver};
use crate::registry::{RequestPathRegistry, DEFAULT_PATHS};
use crate::ring::{Keyspace, DEFAULT_SLOTS};

/// Worker entry used to pre-populate the ring.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedWorker {
    pub id: String,
    pub hostname: String,
}

/// Static endpoint entry for the built-in resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeedEndpoint {
    pub hostname: String,
    pub address: String,
    pub port: u16,
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    /// Keyspace size, a power of two.
    pub slots: u64,
    pub strategy: HashStrategy,
    pub paths: Vec<String>,
    /// Seed workers, added in order.
    pub workers: Vec<SeedWorker>,
    pub endpoints: Vec<SeedEndpoint>,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            slots: DEFAULT_SLOTS,
            strategy: HashStrategy::default(),
            paths: DEFAULT_PATHS.iter().map(|p| p.to_string()).collect(),
            workers: Vec::new(),
            endpoints: Vec::new(),
        }
    }
}

impl RingConfig {
    /// Parse and validate a JSON document.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| Error::InvalidConfig(format!("malformed configuration: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| Error::InvalidConfig(format!("cannot read {}: {e}", path.display())))?;
        Self::from_json(&json)
    }

    /// Like [`from_file`](Self::from_file), but falls back to the default
    /// configuration (empty ring) on any error.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            info!("no configuration file given, starting with an empty ring");
            return Self::default();
        };
        match Self::from_file(path) {
            Ok(config) => {
                info!(
                    path = %path.display(),
                    slots = config.slots,
                    strategy = %config.strategy,
                    workers = config.workers.len(),
                    "loaded configuration"
                );
                config
            }
            Err(e) => {
                warn!(path = %path.display(), error = %e, "falling back to default configuration");
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.keyspace().map(|_| ())
    }

    pub fn keyspace(&self) -> Result<Keyspace> {
        Keyspace::new(self.slots)
    }

    pub fn path_registry(&self) -> RequestPathRegistry {
        RequestPathRegistry::new(&self.paths)
    }

    pub fn resolver(&self) -> StaticResolver {
        self.endpoints
            .iter()
            .map(|e| (e.hostname.clone(), Endpoint::new(e.address.clone(), e.port)))
            .collect()
    }
}
