//! Metrics for the node client and the connection supervisor.

/// Container for metrics.
#[derive(Debug, Clone)]
pub(crate) struct Metrics;

impl Metrics {
    // --- Metric Names ---
    /// Identifier for the counter of successful RPC requests. Labels: `method`, `node`.
    pub(crate) const NODE_RPC_REQUESTS_SUCCESS_TOTAL: &'static str =
        "bridge_node_rpc_requests_success_total";
    /// Identifier for the counter of failed RPC requests. Labels: `method`, `node`.
    pub(crate) const NODE_RPC_REQUESTS_ERROR_TOTAL: &'static str =
        "bridge_node_rpc_requests_error_total";
    /// Identifier for the histogram of RPC request durations. Labels: `method`, `node`.
    pub(crate) const NODE_RPC_REQUEST_DURATION_SECONDS: &'static str =
        "bridge_node_rpc_request_duration_seconds";
    /// Identifier for the gauge tracking the connection state (1 = connected).
    pub(crate) const NODE_CONNECTED: &'static str = "bridge_node_connected";
    /// Identifier for the counter of reconnect attempts. Labels: `result`.
    pub(crate) const NODE_RECONNECTS_TOTAL: &'static str = "bridge_node_reconnects_total";

    pub(crate) const RPC_METHOD_GET_INFO: &'static str = "get_info";
    pub(crate) const RPC_METHOD_GET_BLOCK_DAG_INFO: &'static str = "get_block_dag_info";
    pub(crate) const RPC_METHOD_ESTIMATE_NETWORK_HASHES_PER_SECOND: &'static str =
        "estimate_network_hashes_per_second";
    pub(crate) const RPC_METHOD_GET_BLOCK_TEMPLATE: &'static str = "get_block_template";
    pub(crate) const RPC_METHOD_SUBSCRIBE_NEW_BLOCK_TEMPLATE: &'static str =
        "subscribe_new_block_template";

    /// Initializes the RPC metrics for the client connected to `node`.
    ///
    /// This does two things:
    /// * Describes various metrics.
    /// * Initializes metrics with their labels to 0 so they can be queried immediately.
    pub(crate) fn init(node: &str) {
        Self::describe();
        Self::zero(node);
    }

    fn describe() {
        metrics::describe_counter!(
            Self::NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            metrics::Unit::Count,
            "Total number of successful RPC requests sent to the node"
        );
        metrics::describe_counter!(
            Self::NODE_RPC_REQUESTS_ERROR_TOTAL,
            metrics::Unit::Count,
            "Total number of failed RPC requests sent to the node"
        );
        metrics::describe_histogram!(
            Self::NODE_RPC_REQUEST_DURATION_SECONDS,
            metrics::Unit::Seconds,
            "Duration of RPC requests sent to the node"
        );
        metrics::describe_gauge!(
            Self::NODE_CONNECTED,
            "Whether the bridge currently holds a connection to the node"
        );
        metrics::describe_counter!(
            Self::NODE_RECONNECTS_TOTAL,
            metrics::Unit::Count,
            "Total number of reconnect attempts, by result"
        );
    }

    fn zero_rpc_method(method: &str, node: &str) {
        metrics::counter!(
            Self::NODE_RPC_REQUESTS_SUCCESS_TOTAL,
            "method" => method.to_string(),
            "node" => node.to_string()
        )
        .increment(0);
        metrics::counter!(
            Self::NODE_RPC_REQUESTS_ERROR_TOTAL,
            "method" => method.to_string(),
            "node" => node.to_string()
        )
        .increment(0);
        metrics::histogram!(
            Self::NODE_RPC_REQUEST_DURATION_SECONDS,
            "method" => method.to_string(),
            "node" => node.to_string()
        )
        .record(0.0);
    }

    /// Initializes metrics with their labels to `0` so they appear in Prometheus from the start.
    fn zero(node: &str) {
        Self::zero_rpc_method(Self::RPC_METHOD_GET_INFO, node);
        Self::zero_rpc_method(Self::RPC_METHOD_GET_BLOCK_DAG_INFO, node);
        Self::zero_rpc_method(Self::RPC_METHOD_ESTIMATE_NETWORK_HASHES_PER_SECOND, node);
        Self::zero_rpc_method(Self::RPC_METHOD_GET_BLOCK_TEMPLATE, node);
        Self::zero_rpc_method(Self::RPC_METHOD_SUBSCRIBE_NEW_BLOCK_TEMPLATE, node);
        metrics::counter!(Self::NODE_RECONNECTS_TOTAL, "result" => "success").increment(0);
        metrics::counter!(Self::NODE_RECONNECTS_TOTAL, "result" => "failure").increment(0);
    }

    /// Records the connection state.
    pub(crate) fn set_connected(connected: bool) {
        metrics::gauge!(Self::NODE_CONNECTED).set(if connected { 1.0 } else { 0.0 });
    }

    /// Records the outcome of a reconnect attempt.
    pub(crate) fn record_reconnect(success: bool) {
        let result = if success { "success" } else { "failure" };
        metrics::counter!(Self::NODE_RECONNECTS_TOTAL, "result" => result).increment(1);
    }
}
