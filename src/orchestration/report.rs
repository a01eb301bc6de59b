//! Scan report - per-repository outcomes of one run

use crate::core::error::ScanError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What happened to one repository
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum RepositoryOutcome {
    /// The scanner ran against `repository:tag`
    #[serde(rename_all = "camelCase")]
    Scanned {
        repository: String,
        tag: String,
        /// `None` if the scanner was terminated by a signal
        exit_code: Option<i32>,
    },

    /// No local image was found, scan skipped
    NoTags { repository: String },
}

impl RepositoryOutcome {
    pub fn repository(&self) -> &str {
        match self {
            Self::Scanned { repository, .. } | Self::NoTags { repository } => repository,
        }
    }

    /// Scanned with a non-zero or missing exit code
    pub fn is_failed_scan(&self) -> bool {
        matches!(self, Self::Scanned { exit_code, .. } if *exit_code != Some(0))
    }
}

/// Report of a complete scan run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Host platform as `os_arch`
    pub platform: String,
    pub scanner_path: PathBuf,
    pub outcomes: Vec<RepositoryOutcome>,
}

impl ScanReport {
    pub fn scanned_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RepositoryOutcome::Scanned { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, RepositoryOutcome::NoTags { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed_scan()).count()
    }

    pub fn to_json(&self) -> Result<String, ScanError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| ScanError::io("Failed to serialize scan report", e.into()))
    }

    /// One-line summary for the build log
    pub fn summary(&self) -> String {
        let elapsed = self.finished_at - self.started_at;
        let mut summary = format!(
            "Scanned {} of {} repositories ({} without tags) in {:.1}s",
            self.scanned_count(),
            self.outcomes.len(),
            self.skipped_count(),
            elapsed.num_milliseconds() as f64 / 1000.0
        );
        let failed = self.failed_count();
        if failed > 0 {
            summary.push_str(&format!(", {} scan(s) exited non-zero", failed));
        }
        summary
    }
}
