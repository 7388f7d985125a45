//! Metrics helpers shared by the stratum bridge crates.

mod macros;

mod recorder;
pub use recorder::{NetworkStatsRecorder, PrometheusStatsRecorder};
