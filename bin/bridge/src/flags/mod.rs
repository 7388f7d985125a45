//! CLI flags of the bridge.

mod bridge;
pub use bridge::BridgeArgs;

mod metrics;
pub use metrics::init_unified_metrics;
