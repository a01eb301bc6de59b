//! Secret masking for build log output
//!
//! Every line that reaches the build log, including output forwarded from
//! child processes, passes through a [`SecretMasker`] so the access key is
//! never written in plain text.

use crate::core::build_log::BuildLog;
use crate::security::credentials::AccessKey;
use secrecy::{ExposeSecret, SecretString};

/// Replacement written in place of a secret
pub const MASK: &str = "****";

/// Replaces known secrets in text
///
/// # Examples
///
/// ```
/// use mend_image_scan::security::{AccessKey, SecretMasker};
///
/// let masker = SecretMasker::new(&AccessKey::new("abcdef123456"));
/// assert_eq!(masker.mask("key=abcdef123456"), "key=****");
/// ```
#[derive(Default)]
pub struct SecretMasker {
    secrets: Vec<SecretString>,
}

impl SecretMasker {
    pub fn new(key: &AccessKey) -> Self {
        let mut masker = Self::default();
        masker.add(key.reveal());
        masker
    }

    /// Register another secret. Empty values are ignored.
    pub fn add(&mut self, secret: &str) {
        if !secret.is_empty() {
            self.secrets
                .push(SecretString::new(secret.to_string().into_boxed_str()));
        }
    }

    /// Mask all known secrets in a string
    pub fn mask(&self, text: &str) -> String {
        let mut masked = text.to_string();
        for secret in &self.secrets {
            let secret = secret.expose_secret();
            if masked.contains(secret) {
                masked = masked.replace(secret, MASK);
            }
        }
        masked
    }
}

/// Build log wrapper that masks every line before forwarding it
pub struct MaskedLog<L> {
    inner: L,
    masker: SecretMasker,
}

impl<L: BuildLog> MaskedLog<L> {
    pub fn new(inner: L, masker: SecretMasker) -> Self {
        Self { inner, masker }
    }
}

impl<L: BuildLog> BuildLog for MaskedLog<L> {
    fn line(&self, message: &str) {
        self.inner.line(&self.masker.mask(message));
    }
}
