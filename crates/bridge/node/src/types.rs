//! Data types exchanged with the node.

use derive_more::Display;
use serde::{Deserialize, Serialize};
use url::Url;

/// The endpoint of the node, as supplied by the operator.
///
/// A bare `host:port` is dialed over plain websockets; an address that already carries a scheme
/// (`ws://`, `wss://`) is used as is.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Display)]
pub struct NodeAddress(String);

impl NodeAddress {
    /// Creates a new [`NodeAddress`].
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    /// Returns the address exactly as supplied.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolves the address into the websocket URL to dial.
    pub fn ws_url(&self) -> Result<Url, url::ParseError> {
        let address = self.0.trim();
        if address.contains("://") {
            Url::parse(address)
        } else {
            Url::parse(&format!("ws://{address}"))
        }
    }
}

impl From<&str> for NodeAddress {
    fn from(address: &str) -> Self {
        Self::new(address)
    }
}

impl From<String> for NodeAddress {
    fn from(address: String) -> Self {
        Self(address)
    }
}

/// Whether the connection supervisor currently holds a working client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ConnectionState {
    /// The last connection attempt succeeded.
    Connected,
    /// The last connection attempt failed, or the client was closed.
    Disconnected,
}

/// Response of `getInfo`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeInfo {
    /// The node's p2p identifier.
    pub p2p_id: String,
    /// Number of transactions in the mempool.
    pub mempool_size: u64,
    /// Version string of the node software.
    pub server_version: String,
    /// Whether the node maintains a UTXO index.
    pub is_utxo_indexed: bool,
    /// Whether the node is caught up with the network.
    pub is_synced: bool,
}

/// Response of `getBlockDagInfo`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockDagInfo {
    /// Name of the network the node is on.
    pub network_name: String,
    /// Number of blocks in the DAG.
    pub block_count: u64,
    /// Number of headers in the DAG.
    pub header_count: u64,
    /// Hashes of the current DAG tips.
    pub tip_hashes: Vec<String>,
    /// Current network difficulty.
    pub difficulty: f64,
    /// Past median time of the virtual block, in milliseconds.
    pub past_median_time: i64,
    /// Parents of the virtual block.
    pub virtual_parent_hashes: Vec<String>,
    /// Hash of the pruning point.
    pub pruning_point_hash: String,
    /// DAA score of the virtual block.
    pub virtual_daa_score: u64,
}

/// Response of `estimateNetworkHashesPerSecond`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkHashRate {
    /// Estimated hashes per second over the requested window.
    pub network_hashes_per_second: u64,
}

/// A block template handed out by the node.
///
/// The bridge never inspects the block itself; it is passed through to the session layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockTemplate {
    /// The candidate block, opaque to the bridge.
    pub block: serde_json::Value,
    /// Whether the node was synced when it built the template.
    #[serde(default)]
    pub is_synced: bool,
}

/// Payload of a new block template notification. The node sends no fields; the notification
/// itself is the signal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewBlockTemplateNotification {}
