//! Configuration structures and types for mend-image-scan
//!
//! [`ScanSettings`] is one partial layer (config file, environment or CLI);
//! [`ScanConfig`] is the resolved configuration a scan runs with.

use crate::security::credentials::{AccessKey, ScannerEnvironment};
use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;

/// Base URL the scanner CLI is downloaded from
pub const DEFAULT_DOWNLOAD_BASE_URL: &str = "https://downloads.mend.io/cli";

/// Secret value read from a configuration layer
#[derive(Deserialize)]
#[serde(transparent)]
pub struct SecretValue(String);

impl SecretValue {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    fn into_access_key(self) -> AccessKey {
        AccessKey::new(self.0)
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[REDACTED]")
    }
}

/// One configuration layer; every field is optional
#[derive(Debug, Default, Deserialize)]
pub struct ScanSettings {
    /// Mend account email
    #[serde(default, rename = "userEmail")]
    pub user_email: Option<String>,

    /// Mend user key (prefer `${VAR}` references in files)
    #[serde(default, rename = "userKey")]
    pub user_key: Option<SecretValue>,

    /// Mend service base URL
    #[serde(default, rename = "mendUrl")]
    pub mend_url: Option<String>,

    /// Comma-separated repository names
    #[serde(default, rename = "repoNames")]
    pub repo_names: Option<String>,

    /// Fail the run when a child process exits non-zero (default: true)
    #[serde(default, rename = "failOnNonZeroExit")]
    pub fail_on_non_zero_exit: Option<bool>,

    /// Scanner download settings
    #[serde(default)]
    pub scanner: Option<ScannerSettings>,
}

/// Scanner download settings layer
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct ScannerSettings {
    /// Base URL (default: https://downloads.mend.io/cli)
    #[serde(default, rename = "downloadBaseUrl")]
    pub download_base_url: Option<String>,

    /// Directory the scanner is installed into (default: working directory)
    #[serde(default, rename = "installDir")]
    pub install_dir: Option<PathBuf>,

    /// Download attempts, including the first (default: 1)
    #[serde(default, rename = "downloadAttempts")]
    pub download_attempts: Option<u32>,
}

/// Resolved scanner download options
#[derive(Debug, Clone, PartialEq)]
pub struct ScannerOptions {
    pub download_base_url: String,
    pub install_dir: Option<PathBuf>,
    pub download_attempts: u32,
}

impl Default for ScannerOptions {
    fn default() -> Self {
        Self {
            download_base_url: DEFAULT_DOWNLOAD_BASE_URL.to_string(),
            install_dir: None,
            download_attempts: 1,
        }
    }
}

/// Resolved scan configuration
#[derive(Debug)]
pub struct ScanConfig {
    /// Credentials and service URL injected into child processes
    pub environment: ScannerEnvironment,
    /// Repository names in scan order
    pub repository_names: Vec<String>,
    pub fail_on_non_zero_exit: bool,
    pub scanner: ScannerOptions,
}

impl ScanConfig {
    /// Build a configuration with default scanner options
    ///
    /// # Examples
    ///
    /// ```
    /// use mend_image_scan::core::ScanConfig;
    /// use mend_image_scan::security::AccessKey;
    ///
    /// let config = ScanConfig::new(
    ///     "dev@example.com",
    ///     AccessKey::new("key"),
    ///     "https://saas.mend.io",
    ///     "svc-a,svc-b",
    /// );
    /// assert_eq!(config.repository_names, vec!["svc-a", "svc-b"]);
    /// assert!(config.fail_on_non_zero_exit);
    /// ```
    pub fn new(
        user_email: impl Into<String>,
        access_key: AccessKey,
        mend_url: impl Into<String>,
        repo_names: &str,
    ) -> Self {
        Self {
            environment: ScannerEnvironment::new(user_email, access_key, mend_url),
            repository_names: split_repository_names(repo_names),
            fail_on_non_zero_exit: true,
            scanner: ScannerOptions::default(),
        }
    }

    pub(crate) fn from_parts(
        user_email: String,
        user_key: SecretValue,
        mend_url: String,
        repo_names: &str,
    ) -> Self {
        Self::new(user_email, user_key.into_access_key(), mend_url, repo_names)
    }
}

/// Split a comma-separated repository list
///
/// Segments are kept verbatim: no trimming, no deduplication, empty segments
/// included.
pub fn split_repository_names(raw: &str) -> Vec<String> {
    raw.split(',').map(str::to_string).collect()
}
