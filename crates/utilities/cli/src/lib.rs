//! Shared CLI utilities for the stratum bridge: logging setup, metrics exporter flags and clap
//! styling.

mod log;
pub use log::{FileLogConfig, LogArgs, LogConfig, LogRotation, StdoutLogConfig};

mod tracing;
pub use tracing::LogFormat;

mod metrics;
pub use metrics::MetricsArgs;

mod styles;
pub use styles::cli_styles;
