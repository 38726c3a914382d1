//! Liveness monitoring for ring workers.
//!
//! The monitor periodically probes every registered worker and feeds the
//! results back into the ring:
//! - `Unreachable` for `failure_threshold` consecutive rounds: the worker is
//!   removed
//! - `Relocated(hostname)`: the worker's footprint is rebuilt at the new
//!   hostname
//! - `Healthy`: the failure count is reset
//!
//! How a worker is probed (HTTP heartbeat, container state, ...) is up to
//! the [`Probe`] implementation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use corelib::{MembershipManager, WorkerIdentity};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, info, warn};

/// Result of probing one worker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProbeOutcome {
    Healthy,
    /// Alive, but now reachable under a different hostname.
    Relocated(String),
    Unreachable,
}

/// Checks whether a worker is alive.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn probe(&self, worker: &WorkerIdentity) -> ProbeOutcome;
}

/// Liveness monitor configuration.
#[derive(Debug, Clone)]
pub struct LivenessConfig {
    pub interval: Duration,
    /// Probes that take longer count as `Unreachable`.
    pub timeout: Duration,
    pub failure_threshold: u32,
    /// Stop after this many rounds; `None` runs until the task is aborted.
    pub max_rounds: Option<usize>,
}

/// Actions buffered for a slow consumer before new ones are dropped.
const ACTION_BUFFER: usize = 256;

impl Default for LivenessConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            timeout: Duration::from_millis(2000),
            failure_threshold: 3,
            max_rounds: None,
        }
    }
}

/// What a probing round did to one worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum LivenessAction {
    /// Failed a probe, still below the threshold.
    Suspected { worker_id: String, failures: u32 },
    /// Removed from the ring.
    Removed { worker_id: String, hostname: String },
    /// Re-added at a new hostname.
    Relocated {
        worker_id: String,
        from: String,
        to: String,
    },
}

/// Periodic prober driving membership changes.
pub struct LivenessMonitor<P> {
    membership: MembershipManager,
    probe: Arc<P>,
    config: LivenessConfig,
    failures: Arc<DashMap<String, u32>>,
}

impl<P: Probe> LivenessMonitor<P> {
    pub fn new(membership: MembershipManager, probe: P, config: LivenessConfig) -> Self {
        Self {
            membership,
            probe: Arc::new(probe),
            config,
            failures: Arc::new(DashMap::new()),
        }
    }

    /// Consecutive failure counts by worker id, readable while the monitor runs.
    pub fn failures(&self) -> Arc<DashMap<String, u32>> {
        Arc::clone(&self.failures)
    }

    /// Starts the monitor task.
    ///
    /// Every action taken is also sent on the returned channel, which closes
    /// once the task finishes. A full channel drops actions rather than
    /// stalling the monitor.
    pub fn spawn(self) -> (JoinHandle<()>, mpsc::Receiver<LivenessAction>) {
        let (tx, rx) = mpsc::channel(ACTION_BUFFER);
        let handle = tokio::spawn(async move {
            self.run(tx).await;
        });
        (handle, rx)
    }

    async fn run(self, actions: mpsc::Sender<LivenessAction>) {
        let mut interval = tokio::time::interval(self.config.interval);
        info!(
            interval_ms = self.config.interval.as_millis() as u64,
            failure_threshold = self.config.failure_threshold,
            max_rounds = ?self.config.max_rounds,
            "liveness monitor started"
        );
        let mut rounds = 0;
        while self.config.max_rounds.map_or(true, |max| rounds < max) {
            interval.tick().await;
            for action in self.check_all().await {
                if let Err(mpsc::error::TrySendError::Full(action)) = actions.try_send(action) {
                    warn!(?action, "action channel full, dropping");
                }
            }
            rounds += 1;
        }
        info!(rounds, "liveness monitor stopped");
    }

    /// Probe every registered worker once and apply the results.
    ///
    /// Actions are returned ordered by worker id.
    pub async fn check_all(&self) -> Vec<LivenessAction> {
        let workers = self.membership.workers();
        self.failures
            .retain(|id, _| workers.iter().any(|w| &w.id == id));

        let mut probes = JoinSet::new();
        for worker in workers {
            let probe = Arc::clone(&self.probe);
            let timeout = self.config.timeout;
            probes.spawn(async move {
                let outcome = tokio::time::timeout(timeout, probe.probe(&worker))
                    .await
                    .unwrap_or(ProbeOutcome::Unreachable);
                (worker, outcome)
            });
        }

        let mut results = Vec::new();
        while let Some(joined) = probes.join_next().await {
            match joined {
                Ok(result) => results.push(result),
                Err(e) => warn!(error = %e, "probe task failed"),
            }
        }
        results.sort_by(|(a, _), (b, _)| a.id.cmp(&b.id));

        results
            .into_iter()
            .filter_map(|(worker, outcome)| self.apply(&worker, outcome))
            .collect()
    }

    fn apply(&self, worker: &WorkerIdentity, outcome: ProbeOutcome) -> Option<LivenessAction> {
        match outcome {
            ProbeOutcome::Healthy => {
                self.failures.remove(&worker.id);
                None
            }
            ProbeOutcome::Relocated(hostname) if hostname == worker.hostname => {
                self.failures.remove(&worker.id);
                None
            }
            ProbeOutcome::Relocated(hostname) => {
                self.failures.remove(&worker.id);
                match self.membership.update_worker(&worker.id, &hostname) {
                    Ok(_) => Some(LivenessAction::Relocated {
                        worker_id: worker.id.clone(),
                        from: worker.hostname.clone(),
                        to: hostname,
                    }),
                    Err(e) => {
                        warn!(worker = %worker, error = %e, "relocation failed");
                        None
                    }
                }
            }
            ProbeOutcome::Unreachable => {
                let failures = {
                    let mut count = self.failures.entry(worker.id.clone()).or_insert(0);
                    *count += 1;
                    *count
                };
                if failures < self.config.failure_threshold {
                    debug!(worker = %worker, failures, "worker missed a probe");
                    return Some(LivenessAction::Suspected {
                        worker_id: worker.id.clone(),
                        failures,
                    });
                }

                self.failures.remove(&worker.id);
                match self.membership.remove_worker_by_id(&worker.id) {
                    Ok(_) => {
                        warn!(worker = %worker, failures, "removed unresponsive worker");
                        Some(LivenessAction::Removed {
                            worker_id: worker.id.clone(),
                            hostname: worker.hostname.clone(),
                        })
                    }
                    Err(e) => {
                        warn!(worker = %worker, error = %e, "cannot remove unresponsive worker");
                        None
                    }
                }
            }
        }
    }
}
