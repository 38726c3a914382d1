//! Worker abstractions for the consistent hash ring.
//!
//! Workers are the backend processes requests are routed to. Each one is
//! identified by a string id (e.g. `s1`) whose numeric part feeds the
//! polynomial hash, plus the hostname used to resolve its network endpoint.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Identity of a backend worker participating in the ring.
///
/// Keep this struct small and cheap to clone; endpoint resolution and health
/// state live with external collaborators.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct WorkerIdentity {
    /// Unique worker id, e.g. `s1`.
    pub id: String,
    /// Hostname or container name used to resolve the worker's endpoint.
    pub hostname: String,
    /// Numeric form of `id`.
    pub numeric_id: u64,
}

impl WorkerIdentity {
    /// Construct a worker identity, deriving `numeric_id` from `id`.
    ///
    /// Fails with [`Error::InvalidWorkerId`] if `id` has no numeric form.
    pub fn new(id: impl Into<String>, hostname: impl Into<String>) -> Result<Self> {
        let id = id.into();
        let numeric_id = parse_numeric_id(&id)?;
        Ok(Self {
            id,
            hostname: hostname.into(),
            numeric_id,
        })
    }

    /// Same worker id, new network location.
    pub fn relocated(&self, hostname: impl Into<String>) -> Self {
        Self {
            id: self.id.clone(),
            hostname: hostname.into(),
            numeric_id: self.numeric_id,
        }
    }

    /// Label used by the administrative status report: `"<id> (<hostname>)"`.
    pub fn label(&self) -> String {
        format!("{} ({})", self.id, self.hostname)
    }
}

impl fmt::Display for WorkerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.id, self.hostname)
    }
}

/// Derive the numeric id: an optional run of ASCII letters followed by one or
/// more decimal digits.
pub fn parse_numeric_id(id: &str) -> Result<u64> {
    let digits = id.trim_start_matches(|c: char| c.is_ascii_alphabetic());
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::InvalidWorkerId(id.to_string()));
    }
    digits
        .parse::<u64>()
        .map_err(|_| Error::InvalidWorkerId(id.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_id_with_prefix() {
        assert_eq!(parse_numeric_id("s1").unwrap(), 1);
        assert_eq!(parse_numeric_id("s10159").unwrap(), 10159);
        assert_eq!(parse_numeric_id("srv042").unwrap(), 42);
    }

    #[test]
    fn test_numeric_id_bare_digits() {
        assert_eq!(parse_numeric_id("42").unwrap(), 42);
    }

    #[test]
    fn test_numeric_id_rejected() {
        for bad in ["", "s", "server", "s1a", "s-1", "1s", "s99999999999999999999999"] {
            assert_eq!(
                parse_numeric_id(bad),
                Err(Error::InvalidWorkerId(bad.to_string())),
                "{bad:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_worker_new_and_label() {
        let w = WorkerIdentity::new("s3", "hostC").unwrap();
        assert_eq!(w.numeric_id, 3);
        assert_eq!(w.label(), "s3 (hostC)");
        assert_eq!(w.to_string(), "s3@hostC");
    }

    #[test]
    fn test_relocated_keeps_identity() {
        let w = WorkerIdentity::new("s3", "hostC").unwrap();
        let moved = w.relocated("hostZ");
        assert_eq!(moved.id, "s3");
        assert_eq!(moved.numeric_id, 3);
        assert_eq!(moved.hostname, "hostZ");
    }
}
