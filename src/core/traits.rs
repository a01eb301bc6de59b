//! Core traits and types for image scanning
//!
//! This module defines the seams between the scan workflow and the outside
//! world: spawning child processes and fetching the scanner binary.

use crate::core::build_log::BuildLog;
use crate::core::error::ScanError;
use crate::security::credentials::ScannerEnvironment;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::sync::Arc;

// ============================================================================
// Process Execution
// ============================================================================

/// Where a child's combined stdout/stderr goes
pub enum OutputSink<'a> {
    /// Redirect both streams into a caller-owned file
    Capture(File),
    /// Forward both streams line by line to the build log
    Log(&'a dyn BuildLog),
}

impl fmt::Debug for OutputSink<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputSink::Capture(file) => f.debug_tuple("Capture").field(file).finish(),
            OutputSink::Log(_) => f.write_str("Log"),
        }
    }
}

/// One external command run
///
/// The environment is carried as a [`ScannerEnvironment`] so the access key
/// stays wrapped until it is injected into the child process.
#[derive(Debug)]
pub struct ProcessInvocation<'a> {
    pub program: String,
    pub args: Vec<String>,
    pub env: &'a ScannerEnvironment,
    pub output: OutputSink<'a>,
}

impl<'a> ProcessInvocation<'a> {
    /// Invocation whose output is streamed to `log`
    pub fn streaming<I, S>(
        program: impl Into<String>,
        args: I,
        env: &'a ScannerEnvironment,
        log: &'a dyn BuildLog,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env,
            output: OutputSink::Log(log),
        }
    }

    /// Invocation whose output is written into `file`
    pub fn captured<I, S>(
        program: impl Into<String>,
        args: I,
        env: &'a ScannerEnvironment,
        file: File,
    ) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
            env,
            output: OutputSink::Capture(file),
        }
    }

    /// Program and arguments joined for display
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Result of a process that ran to completion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOutcome {
    /// Exit code, `None` if the process was terminated by a signal
    pub code: Option<i32>,
}

impl ProcessOutcome {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Runs external commands and blocks until they exit
///
/// Implementations must only fail for processes that could not be started or
/// waited on. A clean non-zero exit is reported through [`ProcessOutcome`].
#[async_trait]
pub trait ProcessRunner: Send + Sync {
    async fn execute(&self, invocation: ProcessInvocation<'_>) -> Result<ProcessOutcome, ScanError>;
}

#[async_trait]
impl<T: ProcessRunner + ?Sized> ProcessRunner for Arc<T> {
    async fn execute(&self, invocation: ProcessInvocation<'_>) -> Result<ProcessOutcome, ScanError> {
        (**self).execute(invocation).await
    }
}

// ============================================================================
// Artifact Fetching
// ============================================================================

/// Fetches a remote artifact into memory
#[async_trait]
pub trait ArtifactFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScanError>;
}

#[async_trait]
impl<T: ArtifactFetcher + ?Sized> ArtifactFetcher for Arc<T> {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScanError> {
        (**self).fetch(url).await
    }
}
