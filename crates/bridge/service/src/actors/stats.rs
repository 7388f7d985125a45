//! [`StatsPoller`] samples network stats from the node on a fixed period.

use crate::{BridgeActor, StatsError};
use async_trait::async_trait;
use bridge_metrics::NetworkStatsRecorder;
use bridge_node::{ConnectionSupervisor, NodeClient, NodeConnector};
use std::{convert::Infallible, sync::Arc, time::Duration};
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// One sample of node-reported network stats.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NetworkStatsSample {
    /// Estimated network hash rate.
    pub hashes_per_second: f64,
    /// Number of blocks in the DAG.
    pub block_count: u64,
    /// Current network difficulty.
    pub difficulty: f64,
}

/// Periodically forwards network stats to a [`NetworkStatsRecorder`].
#[derive(Debug)]
pub struct StatsPoller<K: NodeConnector, R> {
    connection: Arc<ConnectionSupervisor<K>>,
    recorder: R,
    interval: Duration,
    hashrate_window: u32,
    cancel_token: CancellationToken,
}

impl<K, R> StatsPoller<K, R>
where
    K: NodeConnector,
    R: NetworkStatsRecorder,
{
    /// Creates a new [`StatsPoller`].
    pub const fn new(
        connection: Arc<ConnectionSupervisor<K>>,
        recorder: R,
        interval: Duration,
        hashrate_window: u32,
        cancel_token: CancellationToken,
    ) -> Self {
        Self { connection, recorder, interval, hashrate_window, cancel_token }
    }

    /// Takes one sample from the node.
    pub async fn sample(&self) -> Result<NetworkStatsSample, StatsError> {
        let client = self.connection.client().map_err(|_| StatsError::NotConnected)?;

        let dag_info = client.get_block_dag_info().await.map_err(StatsError::DagInfo)?;
        let tip = dag_info.tip_hashes.first().ok_or(StatsError::NoTipHashes)?;
        let hashes_per_second = client
            .estimate_network_hashes_per_second(tip, self.hashrate_window)
            .await
            .map_err(StatsError::HashRate)?;

        Ok(NetworkStatsSample {
            hashes_per_second: hashes_per_second as f64,
            block_count: dag_info.block_count,
            difficulty: dag_info.difficulty,
        })
    }
}

#[async_trait]
impl<K, R> BridgeActor for StatsPoller<K, R>
where
    K: NodeConnector,
    R: NetworkStatsRecorder + 'static,
{
    type Error = Infallible;

    async fn start(self) -> Result<(), Self::Error> {
        info!(target: "bridge::stats", interval = ?self.interval, "Starting network stats poller");

        let mut ticker = interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let sample = tokio::select! {
                biased;
                _ = self.cancel_token.cancelled() => break,
                sample = self.sample() => sample,
            };

            match sample {
                Ok(sample) => {
                    debug!(target: "bridge::stats", ?sample, "Sampled network stats");
                    self.recorder.record_network_stats(
                        sample.hashes_per_second,
                        sample.block_count,
                        sample.difficulty,
                    );
                }
                Err(err) => {
                    warn!(target: "bridge::stats", %err, "Failed to sample network stats");
                }
            }
        }

        info!(target: "bridge::stats", "Network stats poller stopped");
        Ok(())
    }
}
