//! Command-line arguments and top-level execution.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use corelib::{Balancer, RingConfig};
use tracing_subscriber::EnvFilter;

use crate::commands::Command;

#[derive(Debug, Parser)]
#[command(
    name = "ringctl",
    version,
    about = "Consistent-hashing request router"
)]
pub struct CliConfig {
    /// Path to a JSON ring configuration. Without one the ring starts empty.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Log level used when `RUST_LOG` is not set.
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

impl CliConfig {
    pub async fn run(self) -> Result<()> {
        init_tracing(&self.log_level);

        let config = RingConfig::load_or_default(self.config.as_deref());
        let balancer = Balancer::from_config(&config).context("invalid ring configuration")?;

        let result = self.command.execute(&balancer, &config).await?;
        println!("{}", serde_json::to_string_pretty(&result)?);
        Ok(())
    }
}

/// Logs go to stderr so stdout stays machine-readable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_route() {
        let cli = CliConfig::try_parse_from([
            "ringctl",
            "-c",
            "ring.json",
            "route",
            "home",
            "heartbeat",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("ring.json")));
        assert_eq!(cli.log_level, "info");
        assert_eq!(
            cli.command,
            Command::Route {
                paths: vec!["home".into(), "heartbeat".into()]
            }
        );
    }

    #[test]
    fn test_parse_add_with_hostnames() {
        let cli = CliConfig::try_parse_from([
            "ringctl", "add", "s1", "s2", "-H", "hostA", "--log-level", "debug",
        ])
        .unwrap();
        assert_eq!(cli.log_level, "debug");
        assert_eq!(
            cli.command,
            Command::Add {
                ids: vec!["s1".into(), "s2".into()],
                hostnames: vec!["hostA".into()],
            }
        );
    }

    #[test]
    fn test_parse_rejects_zero_interval() {
        assert!(CliConfig::try_parse_from(["ringctl", "watch", "--interval", "0"]).is_err());
        assert!(CliConfig::try_parse_from(["ringctl", "remove"]).is_err());
    }
}
