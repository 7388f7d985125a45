//! Configuration of the node connection and block template feed.

use bridge_node::NodeAddress;
use std::time::Duration;
use thiserror::Error;

/// Default period of the stats poller.
pub const DEFAULT_STATS_INTERVAL: Duration = Duration::from_secs(30);
/// Default backoff between sync checks while the node is syncing.
pub const DEFAULT_SYNC_RETRY_INTERVAL: Duration = Duration::from_secs(5);
/// Default backoff after a failed reconnect.
pub const DEFAULT_RECONNECT_RETRY_INTERVAL: Duration = Duration::from_secs(5);
/// Default number of blocks the network hash rate is estimated over.
pub const DEFAULT_HASHRATE_WINDOW: u32 = 1000;
/// Default timeout for a single node request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Configuration errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// The maximum work staleness must be strictly positive.
    #[error("max work staleness must be greater than zero")]
    ZeroWorkStaleness,
    /// An interval that drives a loop was zero.
    #[error("{0} must be greater than zero")]
    ZeroInterval(&'static str),
    /// The hash rate window was zero.
    #[error("hashrate window must be greater than zero")]
    ZeroHashrateWindow,
}

/// Configuration for the [`NodeManager`](crate::NodeManager).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address of the node.
    pub node_address: NodeAddress,
    /// Upper bound on how long miners keep working on the same template when the node sends no
    /// notifications. Also the period of the fallback poll.
    pub max_work_staleness: Duration,
    /// Period of the network stats poller.
    pub stats_interval: Duration,
    /// Backoff between sync checks while the node is syncing.
    pub sync_retry_interval: Duration,
    /// Backoff after a failed reconnect.
    pub reconnect_retry_interval: Duration,
    /// Number of blocks the network hash rate is estimated over.
    pub hashrate_window: u32,
    /// Timeout for a single node request.
    pub request_timeout: Duration,
}

impl BridgeConfig {
    /// Creates a configuration with default intervals.
    pub fn new(node_address: impl Into<NodeAddress>, max_work_staleness: Duration) -> Self {
        Self {
            node_address: node_address.into(),
            max_work_staleness,
            stats_interval: DEFAULT_STATS_INTERVAL,
            sync_retry_interval: DEFAULT_SYNC_RETRY_INTERVAL,
            reconnect_retry_interval: DEFAULT_RECONNECT_RETRY_INTERVAL,
            hashrate_window: DEFAULT_HASHRATE_WINDOW,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Checks the invariants of the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_work_staleness.is_zero() {
            return Err(ConfigError::ZeroWorkStaleness);
        }
        for (name, interval) in [
            ("stats interval", self.stats_interval),
            ("sync retry interval", self.sync_retry_interval),
            ("reconnect retry interval", self.reconnect_retry_interval),
            ("request timeout", self.request_timeout),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::ZeroInterval(name));
            }
        }
        if self.hashrate_window == 0 {
            return Err(ConfigError::ZeroHashrateWindow);
        }
        Ok(())
    }
}
