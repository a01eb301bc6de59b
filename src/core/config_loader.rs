//! Configuration loader for mend-image-scan
//!
//! This module provides configuration loading, merging and validation.

use super::config::*;
use crate::core::error::ScanError;
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Configuration file name looked up in the project directory
pub const CONFIG_FILENAME: &str = ".mend-scan.yaml";

/// Environment variable pattern (${VAR_NAME})
const ENV_VAR_PATTERN: &str = r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}";

/// Configuration load options
#[derive(Default)]
pub struct ConfigLoadOptions {
    /// Project path to look for `.mend-scan.yaml` in
    pub project_path: PathBuf,

    /// Explicit configuration file; must exist when set
    pub config_file: Option<PathBuf>,

    /// CLI arguments (highest priority)
    pub cli_args: Option<ScanSettings>,

    /// Environment variables
    pub env: HashMap<String, String>,
}

impl ConfigLoadOptions {
    /// Options reading the current process environment
    pub fn new<P: Into<PathBuf>>(project_path: P) -> Self {
        Self {
            project_path: project_path.into(),
            config_file: None,
            cli_args: None,
            env: std::env::vars().collect(),
        }
    }
}

// Environment values may hold the user key, print names only
impl fmt::Debug for ConfigLoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<&String> = self.env.keys().collect();
        names.sort();
        f.debug_struct("ConfigLoadOptions")
            .field("project_path", &self.project_path)
            .field("config_file", &self.config_file)
            .field("cli_args", &self.cli_args)
            .field("env", &names)
            .finish()
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from multiple sources with priority
    ///
    /// Priority (high to low):
    /// 1. CLI arguments
    /// 2. Environment variables
    /// 3. Config file (explicit path or ./.mend-scan.yaml)
    /// 4. Default values
    pub async fn load(options: ConfigLoadOptions) -> Result<ScanConfig, ScanError> {
        let mut layers: Vec<ScanSettings> = Vec::new();

        // 3. Config file
        let file_settings = match &options.config_file {
            Some(path) => Some(Self::load_required_file(path).await?),
            None => Self::load_config_file(&options.project_path.join(CONFIG_FILENAME)).await?,
        };
        if let Some(settings) = file_settings {
            layers.push(Self::expand_env_vars(settings, &options.env)?);
        }

        // 2. Environment variables
        if let Some(env_settings) = Self::load_env_config(&options.env)? {
            layers.push(env_settings);
        }

        // 1. CLI arguments (highest priority)
        if let Some(cli_settings) = options.cli_args {
            layers.push(cli_settings);
        }

        Self::resolve(Self::merge_settings(layers))
    }

    async fn load_required_file(path: &Path) -> Result<ScanSettings, ScanError> {
        Self::load_config_file(path).await?.ok_or_else(|| {
            ScanError::config(format!("Config file not found: {}", path.display()))
        })
    }

    /// Load settings from a YAML file, `None` if it does not exist
    pub async fn load_config_file(path: &Path) -> Result<Option<ScanSettings>, ScanError> {
        if !path.exists() {
            return Ok(None);
        }

        debug!(path = %path.display(), "loading config file");
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| ScanError::io_at("Failed to read config file", path, e))?;

        let settings: ScanSettings = serde_yaml::from_str(&content).map_err(|e| {
            ScanError::config(format!("Failed to parse {}: {}", path.display(), e))
        })?;

        Ok(Some(settings))
    }

    /// Load settings from environment variables
    fn load_env_config(env: &HashMap<String, String>) -> Result<Option<ScanSettings>, ScanError> {
        let fail_on_non_zero_exit = match env.get("MEND_FAIL_ON_NONZERO_EXIT") {
            Some(value) => Some(Self::parse_bool("MEND_FAIL_ON_NONZERO_EXIT", value)?),
            None => None,
        };

        let settings = ScanSettings {
            user_email: env.get("MEND_EMAIL").cloned(),
            user_key: env.get("MEND_USER_KEY").map(SecretValue::new),
            mend_url: env.get("MEND_URL").cloned(),
            repo_names: env.get("MEND_REPO_NAMES").cloned(),
            fail_on_non_zero_exit,
            scanner: None,
        };

        let has_values = settings.user_email.is_some()
            || settings.user_key.is_some()
            || settings.mend_url.is_some()
            || settings.repo_names.is_some()
            || settings.fail_on_non_zero_exit.is_some();

        Ok(has_values.then_some(settings))
    }

    fn parse_bool(name: &str, value: &str) -> Result<bool, ScanError> {
        match value.to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" => Ok(true),
            "false" | "0" | "no" => Ok(false),
            other => Err(ScanError::config(format!(
                "{} must be true or false, got '{}'",
                name, other
            ))),
        }
    }

    /// Merge layers; later layers override earlier ones field by field
    fn merge_settings(layers: Vec<ScanSettings>) -> ScanSettings {
        let mut result = ScanSettings::default();

        for layer in layers {
            Self::merge_into(&mut result, layer);
        }

        result
    }

    fn merge_into(target: &mut ScanSettings, source: ScanSettings) {
        if source.user_email.is_some() {
            target.user_email = source.user_email;
        }
        if source.user_key.is_some() {
            target.user_key = source.user_key;
        }
        if source.mend_url.is_some() {
            target.mend_url = source.mend_url;
        }
        if source.repo_names.is_some() {
            target.repo_names = source.repo_names;
        }
        if source.fail_on_non_zero_exit.is_some() {
            target.fail_on_non_zero_exit = source.fail_on_non_zero_exit;
        }

        if let Some(source_scanner) = source.scanner {
            let target_scanner = target.scanner.get_or_insert_with(ScannerSettings::default);
            if source_scanner.download_base_url.is_some() {
                target_scanner.download_base_url = source_scanner.download_base_url;
            }
            if source_scanner.install_dir.is_some() {
                target_scanner.install_dir = source_scanner.install_dir;
            }
            if source_scanner.download_attempts.is_some() {
                target_scanner.download_attempts = source_scanner.download_attempts;
            }
        }
    }

    /// Expand `${VAR}` references in string values of a file layer
    fn expand_env_vars(
        mut settings: ScanSettings,
        env: &HashMap<String, String>,
    ) -> Result<ScanSettings, ScanError> {
        let regex = Regex::new(ENV_VAR_PATTERN)
            .map_err(|e| ScanError::config(format!("Invalid variable pattern: {}", e)))?;

        let expand = |value: Option<String>| -> Result<Option<String>, ScanError> {
            value
                .map(|v| Self::expand_string(&regex, &v, env))
                .transpose()
        };

        settings.user_email = expand(settings.user_email)?;
        settings.mend_url = expand(settings.mend_url)?;
        settings.repo_names = expand(settings.repo_names)?;
        settings.user_key = match settings.user_key {
            Some(key) => Some(SecretValue::new(Self::expand_string(&regex, key.as_str(), env)?)),
            None => None,
        };

        if let Some(scanner) = &mut settings.scanner {
            scanner.download_base_url = expand(scanner.download_base_url.take())?;
        }

        Ok(settings)
    }

    /// Expand environment variables in a single string
    fn expand_string(
        regex: &Regex,
        input: &str,
        env: &HashMap<String, String>,
    ) -> Result<String, ScanError> {
        let mut missing: Option<String> = None;

        let expanded = regex.replace_all(input, |caps: &Captures| {
            let name = &caps[1];
            match env.get(name) {
                Some(value) => value.clone(),
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });

        match missing {
            Some(name) => Err(ScanError::config(format!(
                "Environment variable {} is not set",
                name
            ))),
            None => Ok(expanded.into_owned()),
        }
    }

    /// Turn merged settings into a scan configuration
    pub fn resolve(settings: ScanSettings) -> Result<ScanConfig, ScanError> {
        let user_email = Self::required(settings.user_email, "userEmail (MEND_EMAIL)")?;
        let user_key = settings
            .user_key
            .filter(|key| !key.as_str().is_empty())
            .ok_or_else(|| ScanError::config("userKey (MEND_USER_KEY) is required"))?;
        let mend_url = Self::required(settings.mend_url, "mendUrl (MEND_URL)")?;
        let repo_names = Self::required(settings.repo_names, "repoNames (MEND_REPO_NAMES)")?;

        let mut config = ScanConfig::from_parts(user_email, user_key, mend_url, &repo_names);
        if let Some(fail) = settings.fail_on_non_zero_exit {
            config.fail_on_non_zero_exit = fail;
        }

        if let Some(scanner) = settings.scanner {
            if let Some(url) = scanner.download_base_url {
                config.scanner.download_base_url = url.trim_end_matches('/').to_string();
            }
            config.scanner.install_dir = scanner.install_dir;
            if let Some(attempts) = scanner.download_attempts {
                if attempts == 0 {
                    return Err(ScanError::config("scanner.downloadAttempts must be at least 1"));
                }
                config.scanner.download_attempts = attempts;
            }
        }

        Ok(config)
    }

    fn required(value: Option<String>, field: &str) -> Result<String, ScanError> {
        value
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ScanError::config(format!("{} is required", field)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn full_env() -> HashMap<String, String> {
        let mut env = HashMap::new();
        env.insert("MEND_EMAIL".to_string(), "env@example.com".to_string());
        env.insert("MEND_USER_KEY".to_string(), "env-user-key".to_string());
        env.insert("MEND_URL".to_string(), "https://env.mend.io".to_string());
        env.insert("MEND_REPO_NAMES".to_string(), "svc-a,svc-b".to_string());
        env
    }

    fn options(project: &Path, env: HashMap<String, String>) -> ConfigLoadOptions {
        ConfigLoadOptions {
            project_path: project.to_path_buf(),
            config_file: None,
            cli_args: None,
            env,
        }
    }

    #[tokio::test]
    async fn test_load_from_environment_only() {
        let dir = TempDir::new().unwrap();

        let config = ConfigLoader::load(options(dir.path(), full_env())).await.unwrap();

        assert_eq!(config.environment.email(), "env@example.com");
        assert_eq!(config.environment.access_key().reveal(), "env-user-key");
        assert_eq!(config.environment.service_url(), "https://env.mend.io");
        assert_eq!(config.repository_names, vec!["svc-a", "svc-b"]);
        assert!(config.fail_on_non_zero_exit);
        assert_eq!(config.scanner, ScannerOptions::default());
    }

    #[tokio::test]
    async fn test_file_values_are_overridden_by_env_and_cli() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "userEmail: file@example.com\nuserKey: file-key\nmendUrl: https://file.mend.io\nrepoNames: from-file\nfailOnNonZeroExit: false\n",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert("MEND_URL".to_string(), "https://env.mend.io".to_string());

        let mut opts = options(dir.path(), env);
        opts.cli_args = Some(ScanSettings {
            repo_names: Some("from-cli".to_string()),
            ..Default::default()
        });

        let config = ConfigLoader::load(opts).await.unwrap();

        assert_eq!(config.environment.email(), "file@example.com");
        assert_eq!(config.environment.access_key().reveal(), "file-key");
        assert_eq!(config.environment.service_url(), "https://env.mend.io");
        assert_eq!(config.repository_names, vec!["from-cli"]);
        assert!(!config.fail_on_non_zero_exit);
    }

    #[tokio::test]
    async fn test_file_variables_are_expanded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scan.yaml");
        std::fs::write(
            &path,
            "userEmail: ci@example.com\nuserKey: ${CI_MEND_KEY}\nmendUrl: https://saas.mend.io\nrepoNames: ${SERVICE}-api,${SERVICE}-web\nscanner:\n  downloadBaseUrl: https://mirror.example.com/cli/\n  downloadAttempts: 3\n",
        )
        .unwrap();

        let mut env = HashMap::new();
        env.insert("CI_MEND_KEY".to_string(), "expanded-key".to_string());
        env.insert("SERVICE".to_string(), "shop".to_string());

        let mut opts = options(dir.path(), env);
        opts.config_file = Some(path);

        let config = ConfigLoader::load(opts).await.unwrap();

        assert_eq!(config.environment.access_key().reveal(), "expanded-key");
        assert_eq!(config.repository_names, vec!["shop-api", "shop-web"]);
        assert_eq!(config.scanner.download_base_url, "https://mirror.example.com/cli");
        assert_eq!(config.scanner.download_attempts, 3);
    }

    #[tokio::test]
    async fn test_undefined_variable_is_an_error() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join(CONFIG_FILENAME),
            "userKey: ${NOT_DEFINED_ANYWHERE}\n",
        )
        .unwrap();

        let result = ConfigLoader::load(options(dir.path(), full_env())).await;

        match result {
            Err(ScanError::Config { message }) => assert!(message.contains("NOT_DEFINED_ANYWHERE")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_explicit_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let mut opts = options(dir.path(), full_env());
        opts.config_file = Some(dir.path().join("nope.yaml"));

        assert!(matches!(
            ConfigLoader::load(opts).await,
            Err(ScanError::Config { .. })
        ));
    }

    #[tokio::test]
    async fn test_missing_fields_are_reported() {
        let dir = TempDir::new().unwrap();
        let mut env = full_env();
        env.remove("MEND_USER_KEY");

        match ConfigLoader::load(options(dir.path(), env)).await {
            Err(ScanError::Config { message }) => assert!(message.contains("MEND_USER_KEY")),
            other => panic!("expected config error, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_fail_flag() {
        let mut env = full_env();
        env.insert("MEND_FAIL_ON_NONZERO_EXIT".to_string(), "maybe".to_string());

        assert!(ConfigLoader::load_env_config(&env).is_err());

        env.insert("MEND_FAIL_ON_NONZERO_EXIT".to_string(), "FALSE".to_string());
        let settings = ConfigLoader::load_env_config(&env).unwrap().unwrap();
        assert_eq!(settings.fail_on_non_zero_exit, Some(false));
    }

    #[test]
    fn test_zero_download_attempts_rejected() {
        let settings = ScanSettings {
            user_email: Some("a@b.c".to_string()),
            user_key: Some(SecretValue::new("k")),
            mend_url: Some("https://saas.mend.io".to_string()),
            repo_names: Some("svc".to_string()),
            fail_on_non_zero_exit: None,
            scanner: Some(ScannerSettings {
                download_attempts: Some(0),
                ..Default::default()
            }),
        };

        assert!(ConfigLoader::resolve(settings).is_err());
    }

    #[test]
    fn test_options_debug_hides_env_values() {
        let debug = format!("{:?}", options(Path::new("/work"), full_env()));

        assert!(debug.contains("MEND_USER_KEY"));
        assert!(!debug.contains("env-user-key"));
    }

    #[test]
    fn test_expand_string_leaves_plain_text() {
        let regex = Regex::new(ENV_VAR_PATTERN).unwrap();
        let env = HashMap::new();

        let result = ConfigLoader::expand_string(&regex, "https://saas.mend.io", &env).unwrap();
        assert_eq!(result, "https://saas.mend.io");
    }
}
