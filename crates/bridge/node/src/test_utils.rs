//! Test utilities for code built on top of the node client abstraction.

use crate::{
    BlockDagInfo, BlockTemplate, ClientError, ConnectionSupervisor, NewBlockTemplateHandler,
    NodeAddress, NodeClient, NodeConnector, NodeInfo, NotificationSubscription,
};
use async_trait::async_trait;
use mockall::mock;
use std::{
    collections::VecDeque,
    sync::{Arc, Mutex},
};

mock! {
    /// Mock [`NodeClient`].
    #[derive(Debug)]
    pub NodeClient {}

    #[async_trait]
    impl NodeClient for NodeClient {
        async fn get_info(&self) -> Result<NodeInfo, ClientError>;
        async fn get_block_dag_info(&self) -> Result<BlockDagInfo, ClientError>;
        async fn estimate_network_hashes_per_second(&self, start_hash: &str, window_size: u32) -> Result<u64, ClientError>;
        async fn get_block_template(&self, pay_address: &str, extra_data: &str) -> Result<BlockTemplate, ClientError>;
        async fn register_for_new_block_template_notifications(&self, handler: NewBlockTemplateHandler) -> Result<NotificationSubscription, ClientError>;
        async fn reconnect(&self) -> Result<(), ClientError>;
        async fn disconnect(&self);
    }
}

/// [`NodeConnector`] handing out pre-built clients in order, failing once the queue is empty.
#[derive(Debug, Default)]
pub struct QueueConnector {
    clients: Mutex<VecDeque<MockNodeClient>>,
}

impl QueueConnector {
    /// Creates a connector that will hand out `clients` in order.
    pub fn new(clients: impl IntoIterator<Item = MockNodeClient>) -> Self {
        Self { clients: Mutex::new(clients.into_iter().collect()) }
    }
}

#[async_trait]
impl NodeConnector for QueueConnector {
    type Client = MockNodeClient;

    async fn connect(&self, _address: &NodeAddress) -> Result<Self::Client, ClientError> {
        self.clients.lock().unwrap().pop_front().ok_or(ClientError::Disconnected)
    }
}

/// Builds a supervisor around a single mock client.
pub async fn supervisor_with(client: MockNodeClient) -> Arc<ConnectionSupervisor<QueueConnector>> {
    Arc::new(
        ConnectionSupervisor::connect(
            QueueConnector::new([client]),
            NodeAddress::new("localhost:13110"),
        )
        .await
        .unwrap(),
    )
}

/// A [`NodeInfo`] reporting the given sync state.
pub fn node_info(is_synced: bool) -> NodeInfo {
    NodeInfo { is_synced, server_version: "1.0.0".to_string(), ..Default::default() }
}
