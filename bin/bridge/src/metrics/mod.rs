//! Metrics of the bridge binary.

mod version;
pub use version::VersionInfo;
