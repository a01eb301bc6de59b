//! Scanner provisioning
//!
//! Resolves the download location of the Mend CLI for the running host and
//! installs it.

pub mod http_fetcher;
pub mod platform;
pub mod provisioner;

pub use http_fetcher::HttpFetcher;
pub use platform::{Architecture, OperatingSystem, Platform};
pub use provisioner::ScannerProvisioner;
