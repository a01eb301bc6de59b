//! Host platform detection for the scanner download
//!
//! Free-form OS and processor names are mapped through explicit lookup
//! tables. Anything not in a table is rejected instead of producing a
//! download URL that cannot exist.

use crate::core::error::ScanError;
use serde::Serialize;
use std::fmt;

/// Operating systems the scanner is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatingSystem {
    Windows,
    Darwin,
    Linux,
}

impl OperatingSystem {
    /// Label used in the download path
    pub fn as_str(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "windows",
            OperatingSystem::Darwin => "darwin",
            OperatingSystem::Linux => "linux",
        }
    }

    /// File name of the scanner executable
    pub fn scanner_file_name(&self) -> &'static str {
        match self {
            OperatingSystem::Windows => "mend.exe",
            OperatingSystem::Darwin | OperatingSystem::Linux => "mend",
        }
    }
}

/// Processor architectures the scanner is published for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Architecture {
    #[serde(rename = "amd64")]
    Amd64,
    #[serde(rename = "arm64")]
    Arm64,
    #[serde(rename = "386")]
    X86,
}

impl Architecture {
    pub fn as_str(&self) -> &'static str {
        match self {
            Architecture::Amd64 => "amd64",
            Architecture::Arm64 => "arm64",
            Architecture::X86 => "386",
        }
    }
}

/// OS name fragments, matched by containment in table order
const OS_TABLE: &[(&str, OperatingSystem)] = &[
    ("windows", OperatingSystem::Windows),
    ("mac", OperatingSystem::Darwin),
    ("darwin", OperatingSystem::Darwin),
    ("linux", OperatingSystem::Linux),
];

/// Architecture names, matched exactly
const ARCH_TABLE: &[(&str, Architecture)] = &[
    ("amd64", Architecture::Amd64),
    ("x86_64", Architecture::Amd64),
    ("x64", Architecture::Amd64),
    ("arm64", Architecture::Arm64),
    ("aarch64", Architecture::Arm64),
    ("386", Architecture::X86),
    ("x86", Architecture::X86),
    ("i386", Architecture::X86),
    ("i686", Architecture::X86),
];

/// Operating system and architecture pair
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Platform {
    pub os: OperatingSystem,
    pub arch: Architecture,
}

impl Platform {
    /// Platform of the running host
    pub fn detect() -> Result<Self, ScanError> {
        Self::from_names(std::env::consts::OS, std::env::consts::ARCH)
    }

    /// Map free-form names, case-insensitively
    ///
    /// # Examples
    ///
    /// ```
    /// use mend_image_scan::provisioning::{Architecture, OperatingSystem, Platform};
    ///
    /// let platform = Platform::from_names("Mac OS X", "aarch64").unwrap();
    /// assert_eq!(platform.os, OperatingSystem::Darwin);
    /// assert_eq!(platform.arch, Architecture::Arm64);
    /// ```
    pub fn from_names(os_name: &str, arch_name: &str) -> Result<Self, ScanError> {
        let unsupported = || ScanError::UnsupportedPlatform {
            os: os_name.to_string(),
            arch: arch_name.to_string(),
        };

        let os_lower = os_name.to_lowercase();
        let os = OS_TABLE
            .iter()
            .find(|(fragment, _)| os_lower.contains(fragment))
            .map(|(_, os)| *os)
            .ok_or_else(unsupported)?;

        let arch_lower = arch_name.trim().to_lowercase();
        let arch = ARCH_TABLE
            .iter()
            .find(|(name, _)| arch_lower == *name)
            .map(|(_, arch)| *arch)
            .ok_or_else(unsupported)?;

        Ok(Self { os, arch })
    }

    pub fn scanner_file_name(&self) -> &'static str {
        self.os.scanner_file_name()
    }

    /// `{base}/{os}_{arch}/{file}`
    pub fn download_url(&self, base_url: &str) -> String {
        format!(
            "{}/{}_{}/{}",
            base_url.trim_end_matches('/'),
            self.os.as_str(),
            self.arch.as_str(),
            self.scanner_file_name()
        )
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.os.as_str(), self.arch.as_str())
    }
}
