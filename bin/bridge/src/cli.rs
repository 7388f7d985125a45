//! Contains the bridge CLI.

use crate::flags::{BridgeArgs, init_unified_metrics};
use anyhow::Result;
use bridge_cli::{LogArgs, LogConfig, MetricsArgs, cli_styles};
use bridge_service::NodeManager;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// CLI for the stratum bridge.
#[derive(Parser, Debug)]
#[command(
    name = "stratum-bridge",
    about = "Bridge between a blockchain node and stratum mining clients",
    version,
    styles = cli_styles()
)]
pub struct Cli {
    /// Global args
    #[command(flatten)]
    pub global: LogArgs,

    /// Prometheus metrics args
    #[command(flatten)]
    pub metrics: MetricsArgs,

    /// Node connection args
    #[command(flatten)]
    pub bridge: BridgeArgs,
}

impl Cli {
    /// Runs the CLI.
    pub fn run(self) -> Result<()> {
        self.init_logs(&self.global)?;
        init_unified_metrics(&self.metrics)?;
        let config = self.bridge.init_config()?;

        Self::run_until_ctrl_c(async move {
            let mut manager = NodeManager::connect_ws(config).await?;
            let cancel_token = CancellationToken::new();

            let on_work_ready = || info!(target: "bridge", "New block template available");
            let started = tokio::select! {
                res = manager.start(cancel_token.clone(), on_work_ready) => {
                    res?;
                    true
                }
                _ = tokio::signal::ctrl_c() => false,
            };

            if started {
                tokio::signal::ctrl_c().await?;
            }
            info!(target: "bridge", "Ctrl+C received, initiating shutdown...");

            manager.shutdown().await;
            info!(target: "bridge", "Bridge shut down gracefully.");
            Ok(())
        })
    }

    /// Run until ctrl-c is pressed.
    pub fn run_until_ctrl_c<F>(fut: F) -> Result<()>
    where
        F: std::future::Future<Output = Result<()>>,
    {
        let rt = Self::tokio_runtime().map_err(|e| anyhow::anyhow!(e))?;
        rt.block_on(fut)
    }

    /// Creates a new default tokio multi-thread [`Runtime`](tokio::runtime::Runtime) with all
    /// features enabled
    pub fn tokio_runtime() -> Result<tokio::runtime::Runtime, std::io::Error> {
        tokio::runtime::Builder::new_multi_thread().enable_all().build()
    }

    /// Initializes the tracing subscriber.
    pub fn init_logs(&self, args: &LogArgs) -> Result<()> {
        let filter = tracing_subscriber::EnvFilter::from_default_env();

        LogConfig::new(args.clone()).init_tracing_subscriber(Some(filter))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parses_all_arg_groups() {
        let cli = Cli::parse_from([
            "stratum-bridge",
            "-v",
            "--metrics.enabled",
            "--node.address",
            "node:13110",
        ]);
        assert_eq!(cli.global.level, 1);
        assert!(cli.metrics.enabled);
        assert_eq!(cli.bridge.node_address, "node:13110");
    }
}
