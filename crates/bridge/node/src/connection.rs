//! [`ConnectionSupervisor`] owns the single node client shared by every bridge task.

use crate::{ConnectionState, NodeAddress, NodeClient, NodeConnector, NodeError, metrics::Metrics};
use arc_swap::ArcSwapOption;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// What a successful [`ConnectionSupervisor::reconnect`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconnectOutcome {
    /// The existing client re-established its transport; registrations are preserved.
    Reestablished,
    /// No client existed and a fresh one was built; registrations must be renewed.
    Replaced,
}

/// Holds the node client behind an atomically swapped handle.
///
/// Readers load the current client without locking. Only [`ConnectionSupervisor::reconnect`]
/// and [`ConnectionSupervisor::close`] replace it, serialized among themselves.
#[derive(Debug)]
pub struct ConnectionSupervisor<K: NodeConnector> {
    connector: K,
    address: NodeAddress,
    client: ArcSwapOption<K::Client>,
    connected: AtomicBool,
    reconnect_lock: Mutex<()>,
}

impl<K: NodeConnector> ConnectionSupervisor<K> {
    /// Connects the initial client.
    pub async fn connect(connector: K, address: NodeAddress) -> Result<Self, NodeError> {
        let client = connector
            .connect(&address)
            .await
            .map_err(|source| NodeError::Connection { address: address.clone(), source })?;

        info!(target: "bridge::node", %address, "Connected to node");
        Metrics::set_connected(true);

        Ok(Self {
            connector,
            address,
            client: ArcSwapOption::from_pointee(client),
            connected: AtomicBool::new(true),
            reconnect_lock: Mutex::new(()),
        })
    }

    /// Returns the address of the node.
    pub const fn address(&self) -> &NodeAddress {
        &self.address
    }

    /// Returns the current client.
    pub fn client(&self) -> Result<Arc<K::Client>, NodeError> {
        self.client.load_full().ok_or(NodeError::NotConnected)
    }

    /// Returns the state recorded by the last connection attempt.
    pub fn state(&self) -> ConnectionState {
        if self.connected.load(Ordering::Acquire) {
            ConnectionState::Connected
        } else {
            ConnectionState::Disconnected
        }
    }

    /// Re-establishes the connection to the node.
    ///
    /// If a client exists it reconnects in place, otherwise a fresh one is built against the
    /// stored address. Failure is never fatal; callers may retry indefinitely.
    pub async fn reconnect(&self) -> Result<ReconnectOutcome, NodeError> {
        let _guard = self.reconnect_lock.lock().await;

        let result = match self.client.load_full() {
            Some(client) => client.reconnect().await.map(|()| ReconnectOutcome::Reestablished),
            None => self.connector.connect(&self.address).await.map(|client| {
                self.client.store(Some(Arc::new(client)));
                ReconnectOutcome::Replaced
            }),
        };

        match result {
            Ok(outcome) => {
                info!(target: "bridge::node", address = %self.address, ?outcome, "Reconnected to node");
                self.set_state(ConnectionState::Connected);
                Metrics::record_reconnect(true);
                Ok(outcome)
            }
            Err(source) => {
                warn!(target: "bridge::node", address = %self.address, err = %source, "Failed to reconnect to node");
                self.set_state(ConnectionState::Disconnected);
                Metrics::record_reconnect(false);
                Err(NodeError::Connection { address: self.address.clone(), source })
            }
        }
    }

    /// Releases the client and closes its transport.
    pub async fn close(&self) {
        let _guard = self.reconnect_lock.lock().await;
        if let Some(client) = self.client.swap(None) {
            client.disconnect().await;
            info!(target: "bridge::node", address = %self.address, "Closed node connection");
        }
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        let connected = state == ConnectionState::Connected;
        self.connected.store(connected, Ordering::Release);
        Metrics::set_connected(connected);
    }
}
