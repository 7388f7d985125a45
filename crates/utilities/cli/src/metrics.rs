//! Prometheus metrics CLI args.

use clap::Args;
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// Configuration for the Prometheus metrics exporter.
#[derive(Args, Debug, Clone, PartialEq, Eq)]
pub struct MetricsArgs {
    /// Serves Prometheus metrics over HTTP.
    #[arg(long = "metrics.enabled", global = true, env = "METRICS_ENABLED")]
    pub enabled: bool,
    /// Address the metrics server listens on.
    #[arg(
        long = "metrics.addr",
        global = true,
        default_value_t = IpAddr::V4(Ipv4Addr::UNSPECIFIED),
        env = "METRICS_ADDR"
    )]
    pub addr: IpAddr,
    /// Port the metrics server listens on.
    #[arg(long = "metrics.port", global = true, default_value_t = 9090, env = "METRICS_PORT")]
    pub port: u16,
}

impl Default for MetricsArgs {
    fn default() -> Self {
        Self { enabled: false, addr: IpAddr::V4(Ipv4Addr::UNSPECIFIED), port: 9090 }
    }
}

impl MetricsArgs {
    /// Installs the Prometheus recorder and its HTTP listener, if enabled.
    pub fn init_metrics(&self) -> Result<(), BuildError> {
        if self.enabled {
            let addr = SocketAddr::new(self.addr, self.port);
            PrometheusBuilder::new().with_http_listener(addr).install()?;
            tracing::info!(target: "bridge::cli", %addr, "Serving Prometheus metrics");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct MockCommand {
        #[command(flatten)]
        metrics: MetricsArgs,
    }

    #[test]
    fn test_defaults() {
        let command = MockCommand::parse_from(["test"]);
        assert_eq!(command.metrics, MetricsArgs::default());
    }

    #[test]
    fn test_listen_flags() {
        let command = MockCommand::parse_from([
            "test",
            "--metrics.enabled",
            "--metrics.addr",
            "127.0.0.1",
            "--metrics.port",
            "9100",
        ]);
        assert!(command.metrics.enabled);
        assert_eq!(command.metrics.addr, IpAddr::V4(Ipv4Addr::LOCALHOST));
        assert_eq!(command.metrics.port, 9100);
    }

    #[test]
    fn test_disabled_metrics_install_nothing() {
        assert!(MetricsArgs::default().init_metrics().is_ok());
    }
}
