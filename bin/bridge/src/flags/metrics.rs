//! Prometheus metrics initialization.

use crate::metrics::VersionInfo;
use bridge_cli::MetricsArgs;

/// Installs the Prometheus recorder and describes the metrics of every bridge component.
///
/// This function should be called at the beginning of the program.
pub fn init_unified_metrics(args: &MetricsArgs) -> anyhow::Result<()> {
    args.init_metrics()?;
    if args.enabled {
        bridge_service::Metrics::init();
        VersionInfo::from_build().register_version_metrics();
    }
    Ok(())
}
