//! Scanner credentials with memory-safe handling
//!
//! The access key is held in a `secrecy::SecretString` and only revealed at
//! the moment it is injected into a child process environment.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use tokio::process::Command;

/// Environment variable carrying the account email
pub const MEND_EMAIL: &str = "MEND_EMAIL";
/// Environment variable carrying the plaintext access key
pub const MEND_USER_KEY: &str = "MEND_USER_KEY";
/// Environment variable carrying the service base URL
pub const MEND_URL: &str = "MEND_URL";

/// Opaque handle for the Mend user key
///
/// # Examples
///
/// ```
/// use mend_image_scan::security::AccessKey;
///
/// let key = AccessKey::new("s3cr3t");
/// assert_eq!(key.reveal(), "s3cr3t");
/// assert!(!format!("{:?}", key).contains("s3cr3t"));
/// ```
pub struct AccessKey(SecretString);

impl AccessKey {
    pub fn new(value: impl Into<String>) -> Self {
        let value: String = value.into();
        Self(SecretString::new(value.into_boxed_str()))
    }

    /// Plaintext key. Only for environment injection and log masking.
    pub fn reveal(&self) -> &str {
        self.0.expose_secret()
    }

    pub fn is_empty(&self) -> bool {
        self.reveal().is_empty()
    }
}

impl fmt::Debug for AccessKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("AccessKey([REDACTED])")
    }
}

/// Variables injected into every child process of a scan
#[derive(Debug)]
pub struct ScannerEnvironment {
    email: String,
    access_key: AccessKey,
    service_url: String,
}

impl ScannerEnvironment {
    pub fn new(email: impl Into<String>, access_key: AccessKey, service_url: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            access_key,
            service_url: service_url.into(),
        }
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn access_key(&self) -> &AccessKey {
        &self.access_key
    }

    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// Names of the injected variables, in injection order
    pub fn variable_names() -> [&'static str; 3] {
        [MEND_EMAIL, MEND_USER_KEY, MEND_URL]
    }

    /// Inject the variables into `command` on top of the inherited environment
    pub fn apply(&self, command: &mut Command) {
        command
            .env(MEND_EMAIL, &self.email)
            .env(MEND_USER_KEY, self.access_key.reveal())
            .env(MEND_URL, &self.service_url);
    }
}
