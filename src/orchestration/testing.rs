//! Test doubles for the scan workflow

use crate::core::error::ScanError;
use crate::core::traits::{
    ArtifactFetcher, OutputSink, ProcessInvocation, ProcessOutcome, ProcessRunner,
};
use crate::security::credentials::{AccessKey, ScannerEnvironment};
use async_trait::async_trait;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;

pub const TEST_ACCESS_KEY: &str = "test-user-key-5f2c9a";

pub fn env() -> ScannerEnvironment {
    ScannerEnvironment::new(
        "dev@example.com",
        AccessKey::new(TEST_ACCESS_KEY),
        "https://saas.mend.io",
    )
}

/// A recorded process invocation
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub program: String,
    pub args: Vec<String>,
    pub captured: bool,
    pub email: String,
    pub service_url: String,
}

/// Simulates docker and the scanner CLI
///
/// `docker images <repo>` writes the configured listing into the capture file.
/// Any other program is treated as the scanner: it prints a line that echoes
/// the injected key, so tests can check the build log is masked.
#[derive(Default)]
pub struct FakeRuntime {
    listings: HashMap<String, String>,
    listing_exit_code: i32,
    scan_exit_codes: HashMap<String, i32>,
    failing_scan: Option<String>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl FakeRuntime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tags(mut self, repository: &str, listing: &str) -> Self {
        self.listings
            .insert(repository.to_string(), listing.to_string());
        self
    }

    pub fn with_listing_exit_code(mut self, code: i32) -> Self {
        self.listing_exit_code = code;
        self
    }

    pub fn with_scan_exit_code(mut self, target: &str, code: i32) -> Self {
        self.scan_exit_codes.insert(target.to_string(), code);
        self
    }

    /// Make the scanner fail to start for `target`
    pub fn with_unstartable_scan(mut self, target: &str) -> Self {
        self.failing_scan = Some(target.to_string());
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn scan_calls(&self) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|call| call.program != "docker")
            .collect()
    }
}

#[async_trait]
impl ProcessRunner for FakeRuntime {
    async fn execute(&self, invocation: ProcessInvocation<'_>) -> Result<ProcessOutcome, ScanError> {
        self.calls.lock().unwrap().push(RecordedCall {
            program: invocation.program.clone(),
            args: invocation.args.clone(),
            captured: matches!(invocation.output, OutputSink::Capture(_)),
            email: invocation.env.email().to_string(),
            service_url: invocation.env.service_url().to_string(),
        });

        if invocation.program == "docker" {
            let listing = self
                .listings
                .get(&invocation.args[1])
                .cloned()
                .unwrap_or_default();
            if let OutputSink::Capture(mut file) = invocation.output {
                file.write_all(listing.as_bytes()).unwrap();
            }
            return Ok(ProcessOutcome {
                code: Some(self.listing_exit_code),
            });
        }

        let target = invocation.args[1].clone();
        if self.failing_scan.as_deref() == Some(target.as_str()) {
            return Err(ScanError::Execution {
                program: invocation.program,
                message: "permission denied".to_string(),
            });
        }

        if let OutputSink::Log(log) = invocation.output {
            log.line(&format!(
                "scanning {} with MEND_USER_KEY={}",
                target,
                invocation.env.access_key().reveal()
            ));
        }

        Ok(ProcessOutcome {
            code: Some(self.scan_exit_codes.get(&target).copied().unwrap_or(0)),
        })
    }
}

/// Fetcher returning a fixed payload and recording requested URLs
#[derive(Default)]
pub struct StaticFetcher {
    fail: bool,
    requests: Mutex<Vec<String>>,
}

impl StaticFetcher {
    /// Fetcher answering every request with a 404
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ArtifactFetcher for StaticFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ScanError> {
        self.requests.lock().unwrap().push(url.to_string());
        if self.fail {
            return Err(ScanError::Download {
                url: url.to_string(),
                message: "404 Not Found".to_string(),
            });
        }
        Ok(b"#!/bin/sh\nexit 0\n".to_vec())
    }
}
