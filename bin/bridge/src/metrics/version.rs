//! [`VersionInfo`] metrics

use metrics::gauge;

/// Contains version information for the application and allows for exposing the contained
/// information as a prometheus metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VersionInfo {
    /// The version of the application.
    pub version: &'static str,
    /// The target operating system.
    pub target_os: &'static str,
    /// The target architecture.
    pub target_arch: &'static str,
    /// The build profile (e.g., debug or release).
    pub build_profile: &'static str,
}

impl VersionInfo {
    /// Identifier for the build info gauge.
    pub const BRIDGE_INFO: &'static str = "bridge_info";

    /// Creates a new instance of [`VersionInfo`] from the constants defined in [`crate::version`]
    /// at compile time.
    pub const fn from_build() -> Self {
        Self {
            version: crate::version::CARGO_PKG_VERSION,
            target_os: crate::version::TARGET_OS,
            target_arch: crate::version::TARGET_ARCH,
            build_profile: crate::version::BUILD_PROFILE_NAME,
        }
    }

    /// Exposes the bridge's version information over prometheus.
    pub fn register_version_metrics(&self) {
        let labels: [(&str, &str); 4] = [
            ("version", self.version),
            ("target_os", self.target_os),
            ("target_arch", self.target_arch),
            ("build_profile", self.build_profile),
        ];

        let gauge = gauge!(Self::BRIDGE_INFO, &labels);
        gauge.set(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_build_uses_package_version() {
        let info = VersionInfo::from_build();
        assert_eq!(info.version, env!("CARGO_PKG_VERSION"));
        assert!(!info.target_arch.is_empty());
    }
}
