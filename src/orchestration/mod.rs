//! Orchestration layer for image scanning
//!
//! This module resolves the latest local tag of each configured repository
//! and runs the scanner against it.

pub mod image_scanner;
pub mod report;
pub mod scan_step;
pub mod tag_resolver;

#[cfg(test)]
pub(crate) mod testing;

// Re-export main types for convenience
pub use image_scanner::{ImageScanner, ResolvedTarget};
pub use report::{RepositoryOutcome, ScanReport};
pub use scan_step::{BANNER, ScanStep, perform};
pub use tag_resolver::{CONTAINER_RUNTIME, TAG_FORMAT_ARG, TagResolver, latest_tag};
