//! The observability sink for node-reported network statistics.

use auto_impl::auto_impl;

/// Receives network statistics sampled from the node.
///
/// The stats poller holds an instance of this trait instead of writing to global state, so the
/// sink can be swapped for a fake in tests.
#[auto_impl(&, Arc, Box)]
pub trait NetworkStatsRecorder: Send + Sync {
    /// Records one network stats sample.
    fn record_network_stats(&self, hashes_per_second: f64, block_count: u64, difficulty: f64);
}

/// A [`NetworkStatsRecorder`] that publishes the samples as gauges through the [`metrics`]
/// facade, which the Prometheus exporter then serves.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusStatsRecorder;

impl PrometheusStatsRecorder {
    /// Gauge holding the estimated network hashes per second.
    pub const NETWORK_HASHRATE: &'static str = "bridge_network_hashrate";
    /// Gauge holding the node-reported block count.
    pub const NETWORK_BLOCK_COUNT: &'static str = "bridge_network_block_count";
    /// Gauge holding the node-reported difficulty.
    pub const NETWORK_DIFFICULTY: &'static str = "bridge_network_difficulty";

    /// Creates the recorder and describes its gauges.
    pub fn new() -> Self {
        Self::describe();
        Self
    }

    fn describe() {
        metrics::describe_gauge!(
            Self::NETWORK_HASHRATE,
            metrics::Unit::Count,
            "Estimated network hashes per second reported by the node"
        );
        metrics::describe_gauge!(
            Self::NETWORK_BLOCK_COUNT,
            metrics::Unit::Count,
            "Block count of the node's DAG"
        );
        metrics::describe_gauge!(
            Self::NETWORK_DIFFICULTY,
            metrics::Unit::Count,
            "Current network difficulty reported by the node"
        );
    }
}

impl NetworkStatsRecorder for PrometheusStatsRecorder {
    fn record_network_stats(&self, hashes_per_second: f64, block_count: u64, difficulty: f64) {
        metrics::gauge!(Self::NETWORK_HASHRATE).set(hashes_per_second);
        metrics::gauge!(Self::NETWORK_BLOCK_COUNT).set(block_count as f64);
        metrics::gauge!(Self::NETWORK_DIFFICULTY).set(difficulty);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::{mock, predicate::eq};
    use std::sync::Arc;

    mock! (
        pub Recorder {}

        impl NetworkStatsRecorder for Recorder {
            fn record_network_stats(&self, hashes_per_second: f64, block_count: u64, difficulty: f64);
        }
    );

    fn forward(recorder: impl NetworkStatsRecorder) {
        recorder.record_network_stats(1.5e12, 42, 3.25);
    }

    #[test]
    fn test_arc_recorder_forwards_samples() {
        let mut mock = MockRecorder::new();
        mock.expect_record_network_stats()
            .with(eq(1.5e12), eq(42), eq(3.25))
            .times(1)
            .return_const(());

        forward(Arc::new(mock));
    }

    #[test]
    fn test_prometheus_recorder_without_installed_exporter() {
        // Without a global recorder the facade is a no-op; recording must not panic.
        let recorder = PrometheusStatsRecorder::new();
        recorder.record_network_stats(0.0, 0, 0.0);
        forward(&recorder);
    }
}
