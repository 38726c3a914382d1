//! Registry of request paths the router is allowed to serve.

use std::collections::BTreeSet;

/// Paths served when no configuration overrides them.
pub const DEFAULT_PATHS: [&str; 3] = ["home", "heartbeat", "server_status"];

/// Set of recognized request paths, consulted before any ring lookup.
///
/// A leading `/` is ignored, so `/home` and `home` are the same path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPathRegistry {
    paths: BTreeSet<String>,
}

impl RequestPathRegistry {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            paths: paths
                .into_iter()
                .map(|p| normalize(p.as_ref()).to_string())
                .collect(),
        }
    }

    pub fn register(&mut self, path: &str) -> bool {
        self.paths.insert(normalize(path).to_string())
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(normalize(path))
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.paths.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

impl Default for RequestPathRegistry {
    fn default() -> Self {
        Self::new(DEFAULT_PATHS)
    }
}

/// Strip leading slashes.
pub fn normalize(path: &str) -> &str {
    path.trim_start_matches('/')
}
