//! Scan Step - the complete build step
//!
//! Provisions the scanner once, then scans every configured repository.
//! All build output, including the scanner's own, passes through a masking
//! log so the access key never reaches the sink in plaintext.

use crate::core::build_log::BuildLog;
use crate::core::config::ScanConfig;
use crate::core::error::ScanError;
use crate::core::traits::{ArtifactFetcher, ProcessRunner};
use crate::orchestration::image_scanner::ImageScanner;
use crate::orchestration::report::ScanReport;
use crate::provisioning::http_fetcher::HttpFetcher;
use crate::provisioning::platform::Platform;
use crate::provisioning::provisioner::ScannerProvisioner;
use crate::security::command_executor::CommandExecutor;
use crate::security::secret_masker::{MaskedLog, SecretMasker};
use chrono::Utc;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info};

/// First line written by every run
pub const BANNER: &str = "<<< Mend Cloud Native Security Scanner >>>";

/// Provision-then-scan workflow over pluggable fetcher and runner
pub struct ScanStep<F, R> {
    fetcher: F,
    runner: R,
    platform: Platform,
    capture_dir: PathBuf,
}

impl<F, R> ScanStep<F, R>
where
    F: ArtifactFetcher + Clone,
    R: ProcessRunner,
{
    /// Tag listings are captured under the system temp directory
    pub fn new(fetcher: F, runner: R, platform: Platform) -> Self {
        Self {
            fetcher,
            runner,
            platform,
            capture_dir: std::env::temp_dir(),
        }
    }

    pub fn with_capture_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.capture_dir = dir.into();
        self
    }

    /// Run the step against `working_dir`
    ///
    /// The scanner is installed into `config.scanner.install_dir` (relative
    /// paths resolve against the working directory) or the working directory
    /// itself, and invoked by its absolute path.
    ///
    /// # Errors
    ///
    /// The first provisioning, execution or I/O failure aborts the run.
    pub async fn perform(
        &self,
        config: &ScanConfig,
        working_dir: &Path,
        log: Arc<dyn BuildLog>,
    ) -> Result<ScanReport, ScanError> {
        let started_at = Utc::now();
        let log: Arc<dyn BuildLog> = Arc::new(MaskedLog::new(
            log,
            SecretMasker::new(config.environment.access_key()),
        ));
        log.line(BANNER);

        let working_dir = fs::canonicalize(working_dir)
            .await
            .map_err(|e| ScanError::io_at("Invalid working directory", working_dir, e))?;
        let install_dir = match &config.scanner.install_dir {
            Some(dir) => working_dir.join(dir),
            None => working_dir.clone(),
        };
        debug!(
            platform = %self.platform,
            install_dir = %install_dir.display(),
            repositories = config.repository_names.len(),
            "starting scan step"
        );

        let provisioner = ScannerProvisioner::new(
            self.fetcher.clone(),
            self.platform,
            &config.scanner,
            Arc::clone(&log),
        );
        let scanner_path = provisioner.provision(&install_dir).await?;

        let outcomes = ImageScanner::new(
            &self.runner,
            &config.environment,
            log.as_ref(),
            &scanner_path,
            &self.capture_dir,
        )
        .fail_on_non_zero_exit(config.fail_on_non_zero_exit)
        .run(&config.repository_names)
        .await?;

        let report = ScanReport {
            started_at,
            finished_at: Utc::now(),
            platform: self.platform.to_string(),
            scanner_path,
            outcomes,
        };
        info!(
            scanned = report.scanned_count(),
            skipped = report.skipped_count(),
            failed = report.failed_count(),
            "scan step finished"
        );
        log.line(&report.summary());

        Ok(report)
    }
}

/// Run the step on the current host with real HTTP downloads and processes
pub async fn perform(
    config: &ScanConfig,
    working_dir: &Path,
    log: Arc<dyn BuildLog>,
) -> Result<ScanReport, ScanError> {
    let step = ScanStep::new(
        HttpFetcher::new()?,
        CommandExecutor::new(working_dir)?,
        Platform::detect()?,
    );
    step.perform(config, working_dir, log).await
}
