//! Subcommands and their JSON results.

use std::time::Duration;

use anyhow::Result;
use clap::Subcommand;
use corelib::admin::{
    AddWorkersRequest, AddWorkersResponse, ErrorReport, MembershipReport, RemoveWorkersRequest,
    RemoveWorkersResponse,
};
use corelib::{Balancer, RingConfig};
use liveness::{LivenessAction, LivenessConfig, LivenessMonitor};
use serde::Serialize;
use tracing::info;

use crate::probe::TcpProbe;

#[derive(Debug, Clone, PartialEq, Eq, Subcommand)]
pub enum Command {
    /// Show every worker and the ring positions it holds.
    Status,

    /// Route request paths to workers.
    Route {
        #[arg(required = true)]
        paths: Vec<String>,
    },

    /// Add workers, then report their positions.
    Add {
        /// Worker ids, e.g. `s1 s2`.
        #[arg(required = true)]
        ids: Vec<String>,

        /// Hostnames, in id order. Missing ones are generated.
        #[arg(short = 'H', long = "hostname")]
        hostnames: Vec<String>,
    },

    /// Remove workers by hostname.
    Remove {
        #[arg(required = true)]
        hostnames: Vec<String>,
    },

    /// Probe workers over TCP and drop the ones that stop answering.
    Watch {
        /// Seconds between probing rounds.
        #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u64).range(1..))]
        interval: u64,

        /// Consecutive failed probes before a worker is removed.
        #[arg(long, default_value_t = 3)]
        threshold: u32,

        /// Stop after this many rounds instead of running until Ctrl-C.
        #[arg(long)]
        rounds: Option<usize>,
    },
}

/// Routing result for one path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteLine {
    pub path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub worker: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CommandResult {
    Status(MembershipReport),
    Routes(Vec<RouteLine>),
    Added(AddWorkersResponse),
    Removed(RemoveWorkersResponse),
    Watched {
        actions: Vec<LivenessAction>,
        status: MembershipReport,
    },
}

impl Command {
    pub async fn execute(self, balancer: &Balancer, config: &RingConfig) -> Result<CommandResult> {
        match self {
            Command::Status => Ok(CommandResult::Status(balancer.status())),
            Command::Route { paths } => Ok(CommandResult::Routes(
                paths.iter().map(|p| route_line(balancer, p)).collect(),
            )),
            Command::Add { ids, hostnames } => {
                let request = AddWorkersRequest {
                    n: ids.len(),
                    worker_ids: ids,
                    hostnames,
                };
                Ok(CommandResult::Added(balancer.add_workers(&request)?))
            }
            Command::Remove { hostnames } => {
                let request = RemoveWorkersRequest {
                    n: hostnames.len(),
                    hostnames,
                };
                Ok(CommandResult::Removed(balancer.remove_workers(&request)?))
            }
            Command::Watch {
                interval,
                threshold,
                rounds,
            } => {
                let liveness = LivenessConfig {
                    interval: Duration::from_secs(interval),
                    failure_threshold: threshold,
                    max_rounds: rounds,
                    ..LivenessConfig::default()
                };
                let actions = watch(balancer, config, liveness).await;
                Ok(CommandResult::Watched {
                    actions,
                    status: balancer.status(),
                })
            }
        }
    }
}

fn route_line(balancer: &Balancer, path: &str) -> RouteLine {
    match balancer.route(path) {
        Ok(decision) => RouteLine {
            path: decision.path,
            worker: Some(decision.worker.id),
            url: Some(decision.url),
            error: None,
        },
        Err(e) => RouteLine {
            path: path.to_string(),
            worker: None,
            url: None,
            error: Some(ErrorReport::from(&e)),
        },
    }
}

/// Run the liveness monitor until it finishes its rounds or Ctrl-C.
async fn watch(
    balancer: &Balancer,
    config: &RingConfig,
    liveness: LivenessConfig,
) -> Vec<LivenessAction> {
    let monitor = LivenessMonitor::new(
        balancer.membership().clone(),
        TcpProbe::new(config.resolver()),
        liveness,
    );
    let (handle, mut events) = monitor.spawn();
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);

    let mut actions = Vec::new();
    loop {
        tokio::select! {
            event = events.recv() => match event {
                Some(action) => {
                    info!(?action, "liveness");
                    actions.push(action);
                }
                None => break,
            },
            _ = &mut shutdown => {
                handle.abort();
                break;
            }
        }
    }
    info!(actions = actions.len(), "watch finished");
    actions
}
