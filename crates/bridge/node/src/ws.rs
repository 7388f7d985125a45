//! [`NodeClient`] implementation over a JSON-RPC websocket.

use crate::{
    BlockDagInfo, BlockTemplate, ClientError, NetworkHashRate, NewBlockTemplateHandler,
    NewBlockTemplateNotification, NodeAddress, NodeClient, NodeConnector, NodeInfo,
    NotificationSubscription, metrics::Metrics,
};
use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use bridge_metrics::observe_metrics_for_result_async;
use jsonrpsee::{
    core::client::{ClientT, Subscription, SubscriptionClientT},
    rpc_params,
    ws_client::{WsClient, WsClientBuilder},
};
use std::{fmt, sync::Arc, time::Duration};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use url::Url;

const METHOD_GET_INFO: &str = "getInfo";
const METHOD_GET_BLOCK_DAG_INFO: &str = "getBlockDagInfo";
const METHOD_ESTIMATE_NETWORK_HASHES_PER_SECOND: &str = "estimateNetworkHashesPerSecond";
const METHOD_GET_BLOCK_TEMPLATE: &str = "getBlockTemplate";
const SUBSCRIBE_NEW_BLOCK_TEMPLATE: &str = "subscribeNewBlockTemplate";
const UNSUBSCRIBE_NEW_BLOCK_TEMPLATE: &str = "unsubscribeNewBlockTemplate";

/// [`ClientConfig`] sets the configuration for the websocket node client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// The address of the node.
    pub address: NodeAddress,
    /// Timeout applied to every request.
    pub request_timeout: Duration,
}

/// A live notification registration, re-subscribed after every reconnect.
struct Registration {
    handler: NewBlockTemplateHandler,
    token: CancellationToken,
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration").field("active", &!self.token.is_cancelled()).finish()
    }
}

/// Client for interacting with the node over a websocket.
#[derive(Debug)]
pub struct WsNodeClient {
    config: ClientConfig,
    url: Url,
    /// The attached web socket client, swapped on reconnect.
    ws_client: ArcSwapOption<WsClient>,
    registrations: Mutex<Vec<Registration>>,
}

impl WsNodeClient {
    /// Dials the node described by `config`.
    pub async fn connect(config: ClientConfig) -> Result<Self, ClientError> {
        let url = config.address.ws_url()?;
        Metrics::init(config.address.as_str());

        let client = Self::build_ws_client(&url, config.request_timeout).await?;
        Ok(Self {
            config,
            url,
            ws_client: ArcSwapOption::from_pointee(client),
            registrations: Mutex::new(Vec::new()),
        })
    }

    async fn build_ws_client(url: &Url, request_timeout: Duration) -> Result<WsClient, ClientError> {
        info!(target: "bridge::node", ws_url = %url, "Creating a new web socket client");
        let client =
            WsClientBuilder::default().request_timeout(request_timeout).build(url.as_str()).await?;
        Ok(client)
    }

    /// Returns the current web socket client.
    fn ws_client(&self) -> Result<Arc<WsClient>, ClientError> {
        self.ws_client.load_full().ok_or(ClientError::Disconnected)
    }

    fn node_label(&self) -> String {
        self.config.address.to_string()
    }

    async fn subscribe(
        &self,
        client: &WsClient,
    ) -> Result<Subscription<NewBlockTemplateNotification>, ClientError> {
        let subscription = observe_metrics_for_result_async!(
            Metrics::NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            Metrics::NODE_RPC_REQUESTS_ERROR_TOTAL,
            Metrics::NODE_RPC_REQUEST_DURATION_SECONDS,
            Metrics::RPC_METHOD_SUBSCRIBE_NEW_BLOCK_TEMPLATE,
            async {
              client.subscribe::<NewBlockTemplateNotification, _>(
                  SUBSCRIBE_NEW_BLOCK_TEMPLATE,
                  rpc_params![],
                  UNSUBSCRIBE_NEW_BLOCK_TEMPLATE,
              ).await
            },
            "node" => self.node_label()
        )?;
        Ok(subscription)
    }

    /// Forwards notifications from `subscription` to `handler` until `token` is cancelled or the
    /// node closes the subscription.
    fn spawn_forwarder(
        &self,
        mut subscription: Subscription<NewBlockTemplateNotification>,
        handler: NewBlockTemplateHandler,
        token: CancellationToken,
    ) {
        let node = self.config.address.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => {
                        if let Err(err) = subscription.unsubscribe().await {
                            debug!(target: "bridge::node", %node, %err, "Failed to unsubscribe from block template notifications");
                        }
                        break;
                    }
                    notification = subscription.next() => {
                        if !dispatch(&node, notification, &handler) {
                            break;
                        }
                    }
                }
            }
        });
    }

    /// Renews every live registration against `client`.
    ///
    /// A registration that cannot be renewed is cancelled, so its
    /// [`NotificationSubscription`] reports itself inactive.
    async fn resubscribe(&self, client: &WsClient) {
        let mut registrations = self.registrations.lock().await;
        registrations.retain(|registration| !registration.token.is_cancelled());

        for registration in registrations.iter() {
            match self.subscribe(client).await {
                Ok(subscription) => self.spawn_forwarder(
                    subscription,
                    registration.handler.clone(),
                    registration.token.clone(),
                ),
                Err(err) => {
                    error!(
                        target: "bridge::node",
                        node = %self.config.address,
                        %err,
                        "Failed to renew block template subscription after reconnect"
                    );
                    registration.token.cancel();
                }
            }
        }
        registrations.retain(|registration| !registration.token.is_cancelled());
    }
}

/// Hands one item of the notification stream to `handler`. Returns `false` once the stream ended.
///
/// The notification carries no data the bridge uses, so a payload that fails to decode still
/// signals a new template.
fn dispatch<E: fmt::Display>(
    node: &NodeAddress,
    notification: Option<Result<NewBlockTemplateNotification, E>>,
    handler: &NewBlockTemplateHandler,
) -> bool {
    match notification {
        Some(Ok(notification)) => handler(notification),
        Some(Err(err)) => {
            warn!(target: "bridge::node", %node, %err, "Undecodable block template notification");
            handler(NewBlockTemplateNotification {});
        }
        None => {
            warn!(target: "bridge::node", %node, "Block template subscription closed by node");
            return false;
        }
    }
    true
}

#[async_trait]
impl NodeClient for WsNodeClient {
    async fn get_info(&self) -> Result<NodeInfo, ClientError> {
        let client = self.ws_client()?;
        let info = observe_metrics_for_result_async!(
            Metrics::NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            Metrics::NODE_RPC_REQUESTS_ERROR_TOTAL,
            Metrics::NODE_RPC_REQUEST_DURATION_SECONDS,
            Metrics::RPC_METHOD_GET_INFO,
            async {
              client.request::<NodeInfo, _>(METHOD_GET_INFO, rpc_params![]).await
            },
            "node" => self.node_label()
        )?;
        Ok(info)
    }

    async fn get_block_dag_info(&self) -> Result<BlockDagInfo, ClientError> {
        let client = self.ws_client()?;
        let info = observe_metrics_for_result_async!(
            Metrics::NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            Metrics::NODE_RPC_REQUESTS_ERROR_TOTAL,
            Metrics::NODE_RPC_REQUEST_DURATION_SECONDS,
            Metrics::RPC_METHOD_GET_BLOCK_DAG_INFO,
            async {
              client.request::<BlockDagInfo, _>(METHOD_GET_BLOCK_DAG_INFO, rpc_params![]).await
            },
            "node" => self.node_label()
        )?;
        Ok(info)
    }

    async fn estimate_network_hashes_per_second(
        &self,
        start_hash: &str,
        window_size: u32,
    ) -> Result<u64, ClientError> {
        let client = self.ws_client()?;
        let estimate = observe_metrics_for_result_async!(
            Metrics::NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            Metrics::NODE_RPC_REQUESTS_ERROR_TOTAL,
            Metrics::NODE_RPC_REQUEST_DURATION_SECONDS,
            Metrics::RPC_METHOD_ESTIMATE_NETWORK_HASHES_PER_SECOND,
            async {
              client.request::<NetworkHashRate, _>(
                  METHOD_ESTIMATE_NETWORK_HASHES_PER_SECOND,
                  rpc_params![start_hash, window_size],
              ).await
            },
            "node" => self.node_label()
        )?;
        Ok(estimate.network_hashes_per_second)
    }

    async fn get_block_template(
        &self,
        pay_address: &str,
        extra_data: &str,
    ) -> Result<BlockTemplate, ClientError> {
        let client = self.ws_client()?;
        let template = observe_metrics_for_result_async!(
            Metrics::NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            Metrics::NODE_RPC_REQUESTS_ERROR_TOTAL,
            Metrics::NODE_RPC_REQUEST_DURATION_SECONDS,
            Metrics::RPC_METHOD_GET_BLOCK_TEMPLATE,
            async {
              client.request::<BlockTemplate, _>(
                  METHOD_GET_BLOCK_TEMPLATE,
                  rpc_params![pay_address, extra_data],
              ).await
            },
            "node" => self.node_label()
        )?;
        Ok(template)
    }

    async fn register_for_new_block_template_notifications(
        &self,
        handler: NewBlockTemplateHandler,
    ) -> Result<NotificationSubscription, ClientError> {
        let client = self.ws_client()?;
        let subscription = self.subscribe(&client).await?;

        let token = CancellationToken::new();
        self.registrations
            .lock()
            .await
            .push(Registration { handler: handler.clone(), token: token.clone() });
        self.spawn_forwarder(subscription, handler, token.clone());

        Ok(NotificationSubscription::new(token))
    }

    async fn reconnect(&self) -> Result<(), ClientError> {
        let client = Arc::new(Self::build_ws_client(&self.url, self.config.request_timeout).await?);
        // The previous client closes once the last in-flight request releases it.
        self.ws_client.store(Some(client.clone()));
        self.resubscribe(&client).await;
        Ok(())
    }

    async fn disconnect(&self) {
        for registration in self.registrations.lock().await.drain(..) {
            registration.token.cancel();
        }
        if self.ws_client.swap(None).is_some() {
            info!(target: "bridge::node", node = %self.config.address, "Closed web socket client");
        }
    }
}

/// [`NodeConnector`] producing [`WsNodeClient`]s.
#[derive(Debug, Clone, Copy)]
pub struct WsConnector {
    request_timeout: Duration,
}

impl WsConnector {
    /// Creates a connector whose clients use `request_timeout` for every request.
    pub const fn new(request_timeout: Duration) -> Self {
        Self { request_timeout }
    }
}

#[async_trait]
impl NodeConnector for WsConnector {
    type Client = WsNodeClient;

    async fn connect(&self, address: &NodeAddress) -> Result<Self::Client, ClientError> {
        WsNodeClient::connect(ClientConfig {
            address: address.clone(),
            request_timeout: self.request_timeout,
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_undecodable_notification_still_signals() {
        let received = Arc::new(AtomicUsize::new(0));
        let counter = received.clone();
        let handler: NewBlockTemplateHandler =
            Arc::new(move |_: NewBlockTemplateNotification| {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        let node = NodeAddress::new("localhost:13110");

        let err = serde_json::from_str::<NewBlockTemplateNotification>("42").unwrap_err();
        assert!(dispatch(&node, Some(Err(err)), &handler));
        assert!(dispatch::<serde_json::Error>(
            &node,
            Some(Ok(NewBlockTemplateNotification {})),
            &handler
        ));
        assert_eq!(received.load(Ordering::SeqCst), 2);

        assert!(!dispatch::<serde_json::Error>(&node, None, &handler));
        assert_eq!(received.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_connect_rejects_invalid_address() {
        let connector = WsConnector::new(Duration::from_secs(1));
        let err = connector.connect(&NodeAddress::new("ws://")).await.unwrap_err();
        assert!(matches!(err, ClientError::InvalidAddress(_)));
    }

    #[tokio::test]
    async fn test_connect_fails_without_node() {
        // Nothing listens on port 9 on loopback.
        let connector = WsConnector::new(Duration::from_secs(1));
        let err = connector.connect(&NodeAddress::new("127.0.0.1:9")).await.unwrap_err();
        assert!(err.is_connection_error());
    }
}
