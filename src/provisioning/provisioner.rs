//! Scanner Provisioner - downloads the Mend CLI for the running host
//!
//! The download URL is derived from the host [`Platform`]; the binary is
//! written next to the build (or into the configured install directory),
//! overwriting any previous copy, and marked executable.

use crate::core::build_log::BuildLog;
use crate::core::config::ScannerOptions;
use crate::core::error::ScanError;
use crate::core::retry::{RetryManager, RetryOptions};
use crate::core::traits::ArtifactFetcher;
use crate::provisioning::platform::Platform;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::info;

/// Downloads and installs the scanner binary
pub struct ScannerProvisioner<F> {
    fetcher: F,
    platform: Platform,
    base_url: String,
    retry: RetryManager,
    log: Arc<dyn BuildLog>,
}

impl<F: ArtifactFetcher> ScannerProvisioner<F> {
    pub fn new(
        fetcher: F,
        platform: Platform,
        options: &ScannerOptions,
        log: Arc<dyn BuildLog>,
    ) -> Self {
        Self {
            fetcher,
            platform,
            base_url: options.download_base_url.clone(),
            retry: RetryManager::new(RetryOptions::with_attempts(options.download_attempts)),
            log,
        }
    }

    /// Replace the retry policy for the download
    pub fn with_retry(mut self, options: RetryOptions) -> Self {
        self.retry = RetryManager::new(options);
        self
    }

    pub fn download_url(&self) -> String {
        self.platform.download_url(&self.base_url)
    }

    /// Download the scanner into `install_dir` and return its path
    ///
    /// # Errors
    ///
    /// - `ScanError::Download` - the URL could not be fetched
    /// - `ScanError::Io` - the binary could not be written
    pub async fn provision(&self, install_dir: &Path) -> Result<PathBuf, ScanError> {
        let url = self.download_url();
        self.log.line(&format!("Downloading CLI... {}", url));

        let bytes = self.retry.retry(|| self.fetcher.fetch(&url)).await?;

        fs::create_dir_all(install_dir)
            .await
            .map_err(|e| ScanError::io_at("Failed to create", install_dir, e))?;

        let path = install_dir.join(file_name_of(&url));
        fs::write(&path, &bytes)
            .await
            .map_err(|e| ScanError::io_at("Failed to write", &path, e))?;
        make_executable(&path).await?;

        info!(path = %path.display(), size = bytes.len(), "scanner installed");
        Ok(path)
    }
}

/// Final path segment of a URL
fn file_name_of(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

#[cfg(unix)]
async fn make_executable(path: &Path) -> Result<(), ScanError> {
    use std::os::unix::fs::PermissionsExt;

    let mut permissions = fs::metadata(path)
        .await
        .map_err(|e| ScanError::io_at("Failed to stat", path, e))?
        .permissions();
    permissions.set_mode(0o755);
    fs::set_permissions(path, permissions)
        .await
        .map_err(|e| ScanError::io_at("Failed to mark executable", path, e))
}

#[cfg(not(unix))]
async fn make_executable(_path: &Path) -> Result<(), ScanError> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::build_log::MemoryLog;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Serves canned responses in order and records requested URLs
    struct ScriptedFetcher {
        responses: Mutex<Vec<Result<Vec<u8>, ScanError>>>,
        requests: Mutex<Vec<String>>,
    }

    impl ScriptedFetcher {
        fn new(responses: Vec<Result<Vec<u8>, ScanError>>) -> Self {
            Self {
                responses: Mutex::new(responses),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn requests(&self) -> Vec<String> {
            self.requests.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl ArtifactFetcher for ScriptedFetcher {
        async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScanError> {
            self.requests.lock().unwrap().push(url.to_string());
            self.responses.lock().unwrap().remove(0)
        }
    }

    fn linux() -> Platform {
        Platform::from_names("Linux", "amd64").unwrap()
    }

    fn unreachable(url: &str) -> ScanError {
        ScanError::Download {
            url: url.to_string(),
            message: "connection refused".to_string(),
        }
    }

    #[tokio::test]
    async fn test_provision_writes_executable_binary() {
        let dir = TempDir::new().unwrap();
        let log = MemoryLog::new();
        let fetcher = Arc::new(ScriptedFetcher::new(vec![Ok(b"#!/bin/sh\n".to_vec())]));
        let provisioner = ScannerProvisioner::new(
            fetcher.clone(),
            linux(),
            &ScannerOptions::default(),
            Arc::new(log.clone()),
        );

        let path = provisioner.provision(dir.path()).await.unwrap();

        assert_eq!(path, dir.path().join("mend"));
        assert_eq!(std::fs::read(&path).unwrap(), b"#!/bin/sh\n");
        assert_eq!(
            fetcher.requests(),
            vec!["https://downloads.mend.io/cli/linux_amd64/mend"]
        );
        assert!(log.contains("Downloading CLI... https://downloads.mend.io/cli/linux_amd64/mend"));

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let mode = std::fs::metadata(&path).unwrap().permissions().mode();
            assert_eq!(mode & 0o111, 0o111);
        }
    }

    #[tokio::test]
    async fn test_provision_overwrites_existing_binary() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("mend"), b"old").unwrap();
        let fetcher = ScriptedFetcher::new(vec![Ok(b"new".to_vec())]);
        let provisioner = ScannerProvisioner::new(
            fetcher,
            linux(),
            &ScannerOptions::default(),
            Arc::new(MemoryLog::new()),
        );

        let path = provisioner.provision(dir.path()).await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"new");
    }

    #[tokio::test]
    async fn test_windows_binary_name() {
        let dir = TempDir::new().unwrap();
        let fetcher = ScriptedFetcher::new(vec![Ok(vec![0x4d, 0x5a])]);
        let provisioner = ScannerProvisioner::new(
            fetcher,
            Platform::from_names("Windows 11", "amd64").unwrap(),
            &ScannerOptions::default(),
            Arc::new(MemoryLog::new()),
        );

        let path = provisioner.provision(dir.path()).await.unwrap();

        assert_eq!(path.file_name().unwrap(), "mend.exe");
    }

    #[tokio::test]
    async fn test_download_failure_propagates() {
        let dir = TempDir::new().unwrap();
        let url = "https://downloads.mend.io/cli/linux_amd64/mend";
        let fetcher = ScriptedFetcher::new(vec![Err(unreachable(url))]);
        let provisioner = ScannerProvisioner::new(
            fetcher,
            linux(),
            &ScannerOptions::default(),
            Arc::new(MemoryLog::new()),
        );

        let result = provisioner.provision(dir.path()).await;

        assert!(matches!(result, Err(ScanError::Download { .. })));
        assert!(!dir.path().join("mend").exists());
    }

    #[tokio::test]
    async fn test_retry_recovers_from_transient_failure() {
        let dir = TempDir::new().unwrap();
        let url = "https://mirror.example.com/cli/linux_amd64/mend";
        let fetcher = Arc::new(ScriptedFetcher::new(vec![
            Err(unreachable(url)),
            Ok(b"bin".to_vec()),
        ]));
        let options = ScannerOptions {
            download_base_url: "https://mirror.example.com/cli".to_string(),
            install_dir: None,
            download_attempts: 2,
        };
        let provisioner =
            ScannerProvisioner::new(fetcher.clone(), linux(), &options, Arc::new(MemoryLog::new()))
                .with_retry(RetryOptions {
                    max_attempts: 2,
                    initial_delay: Duration::from_millis(1),
                    max_delay: Duration::from_millis(1),
                    backoff_multiplier: 1.0,
                });

        let path = provisioner.provision(dir.path()).await.unwrap();

        assert_eq!(std::fs::read(path).unwrap(), b"bin");
        assert_eq!(fetcher.requests(), vec![url, url]);
    }

    #[test]
    fn test_file_name_of() {
        assert_eq!(file_name_of("https://downloads.mend.io/cli/windows_amd64/mend.exe"), "mend.exe");
        assert_eq!(file_name_of("mend"), "mend");
    }
}
