//! [`NodeManager`] ties the connection, the block template feed and the stats poller together.

use crate::{
    BlockTemplateFeed, BridgeActor, BridgeConfig, ManagerError, Metrics, SessionContext,
    StatsPoller, WorkReadyHandler,
};
use async_trait::async_trait;
use bridge_metrics::{NetworkStatsRecorder, PrometheusStatsRecorder};
use bridge_node::{
    BlockTemplate, ConnectionSupervisor, NodeClient, NodeConnector, NodeError, SyncMonitor,
    WsConnector,
};
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Pull-style access to block templates for miner sessions.
#[async_trait]
pub trait BlockTemplateSource: Send + Sync {
    /// Builds a block template for `session`.
    async fn get_block_template(&self, session: &SessionContext)
    -> Result<BlockTemplate, NodeError>;
}

/// Keeps a synced connection to the node and announces new work to the session layer.
#[derive(Debug)]
pub struct NodeManager<K: NodeConnector, R = PrometheusStatsRecorder> {
    config: BridgeConfig,
    connection: Arc<ConnectionSupervisor<K>>,
    recorder: R,
    cancel_token: Option<CancellationToken>,
    tasks: JoinSet<()>,
}

impl<K: NodeConnector> NodeManager<K> {
    /// Validates `config` and connects the initial client through `connector`.
    pub async fn new(config: BridgeConfig, connector: K) -> Result<Self, ManagerError> {
        config.validate()?;
        Metrics::init();

        let connection =
            ConnectionSupervisor::connect(connector, config.node_address.clone()).await?;
        Ok(Self {
            config,
            connection: Arc::new(connection),
            recorder: PrometheusStatsRecorder::new(),
            cancel_token: None,
            tasks: JoinSet::new(),
        })
    }
}

impl NodeManager<WsConnector> {
    /// Connects to the node over a JSON-RPC websocket.
    pub async fn connect_ws(config: BridgeConfig) -> Result<Self, ManagerError> {
        let connector = WsConnector::new(config.request_timeout);
        Self::new(config, connector).await
    }
}

impl<K, R> NodeManager<K, R>
where
    K: NodeConnector,
    R: NetworkStatsRecorder + Clone + 'static,
{
    /// Replaces the sink network stats are forwarded to.
    pub fn with_recorder<R2>(self, recorder: R2) -> NodeManager<K, R2>
    where
        R2: NetworkStatsRecorder + Clone + 'static,
    {
        NodeManager {
            config: self.config,
            connection: self.connection,
            recorder,
            cancel_token: self.cancel_token,
            tasks: self.tasks,
        }
    }

    /// Returns the connection to the node.
    pub const fn connection(&self) -> &Arc<ConnectionSupervisor<K>> {
        &self.connection
    }

    /// Returns the configuration.
    pub const fn config(&self) -> &BridgeConfig {
        &self.config
    }

    /// Waits for the node to sync, then launches the block template feed and the stats poller.
    ///
    /// `handler` is invoked by the feed whenever new work should be handed to miners. Both
    /// tasks run until `cancel_token` fires.
    pub async fn start<H>(
        &mut self,
        cancel_token: CancellationToken,
        handler: H,
    ) -> Result<(), ManagerError>
    where
        H: WorkReadyHandler + 'static,
    {
        if self.cancel_token.is_some() {
            return Err(ManagerError::AlreadyStarted);
        }
        self.cancel_token = Some(cancel_token.clone());

        SyncMonitor::new(
            self.connection.clone(),
            self.config.sync_retry_interval,
            cancel_token.clone(),
        )
        .wait_for_sync(true)
        .await?;

        let feed = BlockTemplateFeed::new(
            self.connection.clone(),
            handler,
            self.config.max_work_staleness,
            self.config.sync_retry_interval,
            self.config.reconnect_retry_interval,
            cancel_token.clone(),
        );
        self.tasks.spawn(async move {
            if let Err(err) = feed.start().await {
                error!(target: "bridge::manager", ?err, "Block template feed failed");
            }
        });

        let stats = StatsPoller::new(
            self.connection.clone(),
            self.recorder.clone(),
            self.config.stats_interval,
            self.config.hashrate_window,
            cancel_token,
        );
        self.tasks.spawn(async move {
            if let Err(err) = stats.start().await {
                error!(target: "bridge::manager", ?err, "Network stats poller failed");
            }
        });

        info!(target: "bridge::manager", address = %self.config.node_address, "Node manager started");
        Ok(())
    }

    /// Builds a block template paying out to the session's wallet.
    pub async fn get_block_template(
        &self,
        session: &SessionContext,
    ) -> Result<BlockTemplate, NodeError> {
        let client = self.connection.client()?;
        client
            .get_block_template(&session.wallet_addr, &session.client_description())
            .await
            .map_err(NodeError::BlockTemplate)
    }

    /// Stops the background tasks, waits for them and closes the node connection.
    pub async fn shutdown(&mut self) {
        if let Some(cancel_token) = &self.cancel_token {
            cancel_token.cancel();
        }
        while let Some(result) = self.tasks.join_next().await {
            if let Err(err) = result {
                error!(target: "bridge::manager", %err, "A task encountered an error during shutdown.");
            }
        }
        self.connection.close().await;
        info!(target: "bridge::manager", "Node manager stopped");
    }
}

#[async_trait]
impl<K, R> BlockTemplateSource for NodeManager<K, R>
where
    K: NodeConnector,
    R: NetworkStatsRecorder + Clone + 'static,
{
    async fn get_block_template(
        &self,
        session: &SessionContext,
    ) -> Result<BlockTemplate, NodeError> {
        Self::get_block_template(self, session).await
    }
}
