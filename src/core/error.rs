//! Error handling for image scanning
//!
//! This module provides the error taxonomy for provisioning, command execution
//! and configuration, with recovery guidance, using the thiserror crate.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for scan operations
#[derive(Error, Debug)]
pub enum ScanError {
    // Provisioning errors
    #[error("Failed to download scanner from {url}: {message}")]
    Download { url: String, message: String },

    #[error("Unsupported platform: os '{os}', arch '{arch}'")]
    UnsupportedPlatform { os: String, arch: String },

    // Command execution errors
    #[error("Failed to execute '{program}': {message}")]
    Execution { program: String, message: String },

    #[error("Interrupted while waiting for '{program}'")]
    Interrupted { program: String },

    #[error("'{program}' exited with {}", describe_code(.code))]
    NonZeroExit { program: String, code: Option<i32> },

    // Filesystem errors
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Configuration errors
    #[error("Invalid configuration: {message}")]
    Config { message: String },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("exit code {}", code),
        None => "no exit code (terminated by signal)".to_string(),
    }
}

impl ScanError {
    /// Build an `Io` error with a description of the failed operation
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Build an `Io` error for an operation on `path`
    pub fn io_at(action: &str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::io(format!("{} {}", action, path.into().display()), source)
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Check if this error may succeed when the operation is repeated
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Download { .. })
    }

    /// Get suggested actions for this error
    pub fn suggested_actions(&self) -> Vec<&'static str> {
        match self {
            Self::Download { .. } => vec![
                "Check network access to downloads.mend.io",
                "Increase scanner.downloadAttempts to retry transient failures",
            ],
            Self::UnsupportedPlatform { .. } => vec![
                "Run on a Linux, macOS or Windows host with an amd64, arm64 or 386 processor",
            ],
            Self::Execution { .. } => vec![
                "Check that docker is installed and on PATH",
                "Check that the downloaded scanner is executable",
            ],
            Self::Interrupted { .. } => vec!["Re-run the scan once the build is resumed"],
            Self::NonZeroExit { .. } => vec![
                "Inspect the scanner output in the build log",
                "Pass --allow-scan-failures to continue past failed scans",
            ],
            Self::Io { .. } => vec!["Check permissions of the working directory"],
            Self::Config { .. } => vec![
                "Set MEND_EMAIL, MEND_USER_KEY, MEND_URL and MEND_REPO_NAMES",
                "Or provide them in .mend-scan.yaml",
            ],
        }
    }

    /// Get error code for this error
    pub fn code(&self) -> &'static str {
        match self {
            Self::Download { .. } => "DOWNLOAD_ERROR",
            Self::UnsupportedPlatform { .. } => "UNSUPPORTED_PLATFORM",
            Self::Execution { .. } => "EXECUTION_ERROR",
            Self::Interrupted { .. } => "INTERRUPTED",
            Self::NonZeroExit { .. } => "NON_ZERO_EXIT",
            Self::Io { .. } => "IO_ERROR",
            Self::Config { .. } => "CONFIG_ERROR",
        }
    }
}
