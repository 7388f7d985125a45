//! [`SyncMonitor`] waits for the node to report itself synced.

use crate::{ConnectionSupervisor, NodeClient, NodeConnector, NodeError};
use std::{sync::Arc, time::Duration};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Blocks callers until the node is synced.
///
/// Query failures are returned immediately so the caller can decide to reconnect: transport
/// failures as [`NodeError::Connection`], requests the node rejected as [`NodeError::Rpc`]. A
/// node that answers but is still syncing is waited for, since that resolves on its own.
#[derive(Debug)]
pub struct SyncMonitor<K: NodeConnector> {
    connection: Arc<ConnectionSupervisor<K>>,
    retry_interval: Duration,
    cancel_token: CancellationToken,
}

impl<K: NodeConnector> SyncMonitor<K> {
    /// Creates a new [`SyncMonitor`] polling every `retry_interval` while the node is syncing.
    pub const fn new(
        connection: Arc<ConnectionSupervisor<K>>,
        retry_interval: Duration,
        cancel_token: CancellationToken,
    ) -> Self {
        Self { connection, retry_interval, cancel_token }
    }

    /// Returns once the node reports itself synced.
    ///
    /// The sync state is queried on every call and never cached.
    pub async fn wait_for_sync(&self, verbose: bool) -> Result<(), NodeError> {
        let address = self.connection.address();
        if verbose {
            info!(target: "bridge::sync", %address, "Checking node sync state");
        }

        loop {
            let client = self.connection.client()?;
            let info = client.get_info().await.map_err(|source| {
                let address = address.clone();
                if source.is_connection_error() {
                    NodeError::Connection { address, source }
                } else {
                    NodeError::Rpc { address, source }
                }
            })?;
            if info.is_synced {
                break;
            }

            warn!(
                target: "bridge::sync",
                %address,
                retry_in = ?self.retry_interval,
                "Node is not synced, waiting for sync before handing out work"
            );
            tokio::select! {
                _ = self.cancel_token.cancelled() => return Err(NodeError::Cancelled),
                _ = tokio::time::sleep(self.retry_interval) => {}
            }
        }

        if verbose {
            info!(target: "bridge::sync", %address, "Node synced");
        }
        Ok(())
    }
}
