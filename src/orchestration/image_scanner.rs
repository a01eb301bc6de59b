//! Image Scanner - scans the latest local image of each repository
//!
//! Repositories are processed strictly in order, one at a time. The first
//! error aborts the run and leaves later repositories unprocessed.

use crate::core::build_log::BuildLog;
use crate::core::error::ScanError;
use crate::core::traits::{ProcessInvocation, ProcessRunner};
use crate::orchestration::report::RepositoryOutcome;
use crate::orchestration::tag_resolver::TagResolver;
use crate::security::credentials::ScannerEnvironment;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A repository paired with its resolved tag
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedTarget {
    pub repository: String,
    pub tag: String,
}

impl fmt::Display for ResolvedTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository, self.tag)
    }
}

/// Runs the scanner CLI against each repository's latest tag
pub struct ImageScanner<'a, R: ?Sized> {
    runner: &'a R,
    env: &'a ScannerEnvironment,
    log: &'a dyn BuildLog,
    scanner_path: PathBuf,
    capture_dir: PathBuf,
    fail_on_non_zero_exit: bool,
}

impl<'a, R: ProcessRunner + ?Sized> ImageScanner<'a, R> {
    pub fn new(
        runner: &'a R,
        env: &'a ScannerEnvironment,
        log: &'a dyn BuildLog,
        scanner_path: impl Into<PathBuf>,
        capture_dir: impl AsRef<Path>,
    ) -> Self {
        Self {
            runner,
            env,
            log,
            scanner_path: scanner_path.into(),
            capture_dir: capture_dir.as_ref().to_path_buf(),
            fail_on_non_zero_exit: true,
        }
    }

    pub fn fail_on_non_zero_exit(mut self, fail: bool) -> Self {
        self.fail_on_non_zero_exit = fail;
        self
    }

    /// Scan every repository in list order
    ///
    /// # Errors
    ///
    /// - `ScanError::NonZeroExit` - docker or the scanner failed and
    ///   fail-on-nonzero is set
    /// - `ScanError::Execution` / `ScanError::Io` - a command could not run or
    ///   its output could not be read
    pub async fn run(&self, repositories: &[String]) -> Result<Vec<RepositoryOutcome>, ScanError> {
        let resolver = TagResolver::new(self.runner, self.env, self.log, &self.capture_dir)
            .fail_on_non_zero_exit(self.fail_on_non_zero_exit);
        let mut outcomes = Vec::with_capacity(repositories.len());

        for repository in repositories {
            self.log.line(&format!("Processing repository: {}", repository));

            let Some(tag) = resolver.resolve(repository).await? else {
                self.log.line("No installed tags were found");
                outcomes.push(RepositoryOutcome::NoTags {
                    repository: repository.clone(),
                });
                continue;
            };

            let target = ResolvedTarget {
                repository: repository.clone(),
                tag,
            };
            outcomes.push(self.scan(target).await?);
        }

        Ok(outcomes)
    }

    async fn scan(&self, target: ResolvedTarget) -> Result<RepositoryOutcome, ScanError> {
        self.log
            .line(&format!("Performing Mend image scan for tag: {}", target));

        let program = self.scanner_path.to_string_lossy().into_owned();
        let outcome = self
            .runner
            .execute(ProcessInvocation::streaming(
                program.as_str(),
                ["image".to_string(), target.to_string(), "--no-color".to_string()],
                self.env,
                self.log,
            ))
            .await?;

        if outcome.success() {
            info!(target = %target, "scan complete");
        } else if self.fail_on_non_zero_exit {
            return Err(ScanError::NonZeroExit {
                program,
                code: outcome.code,
            });
        } else {
            warn!(target = %target, code = ?outcome.code, "scan exited unsuccessfully");
            self.log.line(&format!(
                "Mend image scan for {} exited with code {:?}",
                target, outcome.code
            ));
        }

        Ok(RepositoryOutcome::Scanned {
            repository: target.repository,
            tag: target.tag,
            exit_code: outcome.code,
        })
    }
}
