use crate::ConfigError;
use bridge_node::{ClientError, NodeError};
use thiserror::Error;

/// Errors returned by the [`NodeManager`](crate::NodeManager).
#[derive(Debug, Error)]
pub enum ManagerError {
    /// The configuration is invalid.
    #[error("invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// The node could not be reached or is unusable.
    #[error(transparent)]
    Node(#[from] NodeError),

    /// The manager was started twice.
    #[error("node manager already started")]
    AlreadyStarted,
}

/// Reasons a network stats sample could not be taken. Only ever logged.
#[derive(Debug, Error)]
pub enum StatsError {
    /// The supervisor holds no client.
    #[error("not connected to node")]
    NotConnected,

    /// Fetching the DAG info failed.
    #[error("failed to get block dag info: {0}")]
    DagInfo(#[source] ClientError),

    /// The node reported no DAG tips to estimate from.
    #[error("node reported no tip hashes")]
    NoTipHashes,

    /// Estimating the hash rate failed.
    #[error("failed to estimate network hashes per second: {0}")]
    HashRate(#[source] ClientError),
}
