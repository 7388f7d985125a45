//! Node connection flags.

use bridge_node::NodeAddress;
use bridge_service::{BridgeConfig, ConfigError};
use clap::Args;
use std::time::Duration;

/// Node connection and work feed arguments.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct BridgeArgs {
    /// Address of the node's RPC endpoint. A bare `host:port` is dialed over `ws://`.
    #[arg(long = "node.address", env = "NODE_ADDRESS", default_value = "localhost:13110")]
    pub node_address: String,

    /// Maximum time in milliseconds miners keep working on the same block template when the
    /// node sends no new block template notification.
    #[arg(long = "block-wait-time", env = "BLOCK_WAIT_TIME", default_value_t = 3000)]
    pub block_wait_time_ms: u64,

    /// Interval in seconds between network stats samples.
    #[arg(long = "stats.interval", env = "STATS_INTERVAL", default_value_t = 30)]
    pub stats_interval_secs: u64,

    /// Interval in seconds between sync checks while the node is syncing.
    #[arg(long = "sync.retry-interval", env = "SYNC_RETRY_INTERVAL", default_value_t = 5)]
    pub sync_retry_interval_secs: u64,

    /// Interval in seconds between reconnect attempts while the node is unreachable.
    #[arg(long = "reconnect.retry-interval", env = "RECONNECT_RETRY_INTERVAL", default_value_t = 5)]
    pub reconnect_retry_interval_secs: u64,

    /// Number of blocks the network hash rate is estimated over.
    #[arg(long = "hashrate.window", env = "HASHRATE_WINDOW", default_value_t = 1000)]
    pub hashrate_window: u32,

    /// Timeout in seconds for a single node request.
    #[arg(long = "node.request-timeout", env = "NODE_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout_secs: u64,
}

impl BridgeArgs {
    /// Builds and validates the [`BridgeConfig`].
    pub fn init_config(&self) -> Result<BridgeConfig, ConfigError> {
        let config = BridgeConfig {
            node_address: NodeAddress::new(self.node_address.clone()),
            max_work_staleness: Duration::from_millis(self.block_wait_time_ms),
            stats_interval: Duration::from_secs(self.stats_interval_secs),
            sync_retry_interval: Duration::from_secs(self.sync_retry_interval_secs),
            reconnect_retry_interval: Duration::from_secs(self.reconnect_retry_interval_secs),
            hashrate_window: self.hashrate_window,
            request_timeout: Duration::from_secs(self.request_timeout_secs),
        };
        config.validate()?;
        Ok(config)
    }
}
