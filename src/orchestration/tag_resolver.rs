//! Tag Resolver - finds the most recently created local tag of a repository
//!
//! `docker images <repo>` lists tags newest first, so the first line of the
//! tag-only listing is taken as the latest tag.

use crate::core::build_log::BuildLog;
use crate::core::error::ScanError;
use crate::core::traits::{ProcessInvocation, ProcessRunner};
use crate::security::credentials::ScannerEnvironment;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Container runtime queried for local images
pub const CONTAINER_RUNTIME: &str = "docker";

/// Restricts the image listing to the tag column
pub const TAG_FORMAT_ARG: &str = "--format={{.Tag}}";

/// Resolves the latest local tag of a repository
pub struct TagResolver<'a, R: ?Sized> {
    runner: &'a R,
    env: &'a ScannerEnvironment,
    log: &'a dyn BuildLog,
    capture_dir: PathBuf,
    fail_on_non_zero_exit: bool,
}

impl<'a, R: ProcessRunner + ?Sized> TagResolver<'a, R> {
    pub fn new(
        runner: &'a R,
        env: &'a ScannerEnvironment,
        log: &'a dyn BuildLog,
        capture_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            runner,
            env,
            log,
            capture_dir: capture_dir.as_ref().to_path_buf(),
            fail_on_non_zero_exit: true,
        }
    }

    /// Treat a failed image listing as an error (default) or parse it anyway
    pub fn fail_on_non_zero_exit(mut self, fail: bool) -> Self {
        self.fail_on_non_zero_exit = fail;
        self
    }

    /// Latest tag of `repository`, `None` if no image is installed
    ///
    /// Output is captured into a temporary file unique to this call, which is
    /// removed when the call returns.
    pub async fn resolve(&self, repository: &str) -> Result<Option<String>, ScanError> {
        self.log.line("Extracting latest image tag...");

        let capture = tempfile::Builder::new()
            .prefix("mend-tags-")
            .suffix(".txt")
            .tempfile_in(&self.capture_dir)
            .map_err(|e| ScanError::io_at("Failed to create capture file in", &self.capture_dir, e))?;
        let handle = capture
            .as_file()
            .try_clone()
            .map_err(|e| ScanError::io("Failed to duplicate capture file handle", e))?;

        let outcome = self
            .runner
            .execute(ProcessInvocation::captured(
                CONTAINER_RUNTIME,
                ["images", repository, TAG_FORMAT_ARG],
                self.env,
                handle,
            ))
            .await?;

        if !outcome.success() {
            if self.fail_on_non_zero_exit {
                return Err(ScanError::NonZeroExit {
                    program: CONTAINER_RUNTIME.to_string(),
                    code: outcome.code,
                });
            }
            self.log.line(&format!(
                "{} images exited with code {:?}, using its output anyway",
                CONTAINER_RUNTIME, outcome.code
            ));
        }

        let text = fs::read_to_string(capture.path())
            .await
            .map_err(|e| ScanError::io_at("Failed to read", capture.path(), e))?;
        debug!(repository, bytes = text.len(), "tag listing captured");

        Ok(latest_tag(&text))
    }
}

/// First line of a tag listing
///
/// Returns `None` for empty or whitespace-only output. A blank first line
/// followed by more output is returned as an empty tag.
///
/// # Examples
///
/// ```
/// use mend_image_scan::orchestration::latest_tag;
///
/// assert_eq!(latest_tag("v2\nv1\n"), Some("v2".to_string()));
/// assert_eq!(latest_tag(""), None);
/// ```
pub fn latest_tag(text: &str) -> Option<String> {
    if text.trim().is_empty() {
        return None;
    }

    text.split('\n')
        .next()
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_string())
}
