pub mod core;
pub mod orchestration;
pub mod provisioning;
pub mod security;

pub use crate::core::*;
pub use orchestration::{RepositoryOutcome, ScanReport, ScanStep, perform};
pub use provisioning::Platform;
pub use security::{AccessKey, ScannerEnvironment};
