use crate::{
    BlockDagInfo, BlockTemplate, ClientError, NewBlockTemplateNotification, NodeAddress, NodeInfo,
};
use async_trait::async_trait;
use std::{fmt::Debug, sync::Arc};
use tokio_util::sync::CancellationToken;

/// Callback invoked by the client for every new block template notification.
///
/// Handlers run on the client's notification task and must not block.
pub type NewBlockTemplateHandler = Arc<dyn Fn(NewBlockTemplateNotification) + Send + Sync>;

/// Trait for a node client that provides the RPCs the bridge needs.
#[async_trait]
pub trait NodeClient: Send + Sync + Debug {
    /// Fetches the node's [`NodeInfo`], including its sync state.
    async fn get_info(&self) -> Result<NodeInfo, ClientError>;

    /// Fetches the current [`BlockDagInfo`].
    async fn get_block_dag_info(&self) -> Result<BlockDagInfo, ClientError>;

    /// Estimates the network hash rate over `window_size` blocks ending at `start_hash`.
    async fn estimate_network_hashes_per_second(
        &self,
        start_hash: &str,
        window_size: u32,
    ) -> Result<u64, ClientError>;

    /// Requests a fresh [`BlockTemplate`] paying out to `pay_address`.
    async fn get_block_template(
        &self,
        pay_address: &str,
        extra_data: &str,
    ) -> Result<BlockTemplate, ClientError>;

    /// Subscribes `handler` to new block template notifications.
    ///
    /// The registration stays active until the returned [`NotificationSubscription`] is dropped,
    /// and survives [`NodeClient::reconnect`].
    async fn register_for_new_block_template_notifications(
        &self,
        handler: NewBlockTemplateHandler,
    ) -> Result<NotificationSubscription, ClientError>;

    /// Re-establishes the transport in place.
    async fn reconnect(&self) -> Result<(), ClientError>;

    /// Closes the transport.
    async fn disconnect(&self);
}

/// Builds [`NodeClient`]s for a [`NodeAddress`].
#[async_trait]
pub trait NodeConnector: Send + Sync + Debug + 'static {
    /// The client type produced by this connector.
    type Client: NodeClient + 'static;

    /// Connects a new client to `address`.
    async fn connect(&self, address: &NodeAddress) -> Result<Self::Client, ClientError>;
}

/// Guard for an active notification registration. Dropping it unsubscribes.
#[derive(Debug)]
pub struct NotificationSubscription {
    token: CancellationToken,
}

impl NotificationSubscription {
    /// Creates a guard that cancels `token` when dropped.
    pub const fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Returns `true` while the registration is live.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
    }

    /// Ends the registration.
    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for NotificationSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropping_subscription_cancels_token() {
        let token = CancellationToken::new();
        let subscription = NotificationSubscription::new(token.clone());
        assert!(subscription.is_active());

        subscription.unsubscribe();
        assert!(token.is_cancelled());
    }
}
