//! Build log sinks
//!
//! Every notable step of a scan, and the live output of the scanner itself,
//! is written line by line to a [`BuildLog`]. The CLI prints to stdout;
//! embedders and tests can collect lines with [`MemoryLog`].

use std::io::Write;
use std::sync::{Arc, Mutex};

/// Line-oriented sink for build output
pub trait BuildLog: Send + Sync {
    /// Write a single line (without trailing newline)
    fn line(&self, message: &str);
}

impl<L: BuildLog + ?Sized> BuildLog for Arc<L> {
    fn line(&self, message: &str) {
        (**self).line(message)
    }
}

/// Writes build log lines to standard output
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsoleLog;

impl BuildLog for ConsoleLog {
    fn line(&self, message: &str) {
        let stdout = std::io::stdout();
        let mut handle = stdout.lock();
        // A closed stdout must not abort the scan
        let _ = writeln!(handle, "{}", message);
    }
}

/// Collects build log lines in memory
///
/// # Examples
///
/// ```
/// use mend_image_scan::core::{BuildLog, MemoryLog};
///
/// let log = MemoryLog::new();
/// log.line("Processing repository: svc-a");
/// assert!(log.contains("svc-a"));
/// ```
#[derive(Debug, Default, Clone)]
pub struct MemoryLog {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines written so far
    pub fn lines(&self) -> Vec<String> {
        self.lines
            .lock()
            .map(|lines| lines.clone())
            .unwrap_or_default()
    }

    /// Check if any line contains `needle`
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|line| line.contains(needle))
    }
}

impl BuildLog for MemoryLog {
    fn line(&self, message: &str) {
        if let Ok(mut lines) = self.lines.lock() {
            lines.push(message.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_log_keeps_order() {
        let log = MemoryLog::new();
        log.line("first");
        log.line("second");

        assert_eq!(log.lines(), vec!["first", "second"]);
    }

    #[test]
    fn test_memory_log_clones_share_lines() {
        let log = MemoryLog::new();
        let shared: Arc<dyn BuildLog> = Arc::new(log.clone());
        shared.line("through the arc");

        assert!(log.contains("through the arc"));
        assert!(!log.contains("missing"));
    }
}
