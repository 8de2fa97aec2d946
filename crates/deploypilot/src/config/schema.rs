use std::path::{Component, Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use secrecy::SecretString;
use serde::Deserialize;

use crate::error::ConfigError;
use crate::github::DEFAULT_API_BASE_URL;
use crate::gitops::DEFAULT_CLONE_BASE_URL;
use crate::secrets::{resolve_secret, resolve_secret_optional};

/// Agent configuration, read from YAML with camelCase keys.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[serde(default)]
    pub owner: String,
    #[serde(default)]
    pub repo: String,
    /// Subpath to watch; empty watches the whole repository.
    #[serde(default)]
    pub monitor_path: String,
    /// Poll interval in seconds.
    #[serde(default = "default_interval")]
    pub interval: u64,
    #[serde(default)]
    pub script: String,

    #[serde(default)]
    pub age_secret: Option<String>,
    #[serde(default)]
    pub age_secret_file: Option<String>,
    #[serde(default)]
    pub age_secret_env_var: Option<String>,

    #[serde(default)]
    pub github_token: Option<String>,
    #[serde(default)]
    pub github_token_file: Option<String>,
    #[serde(default)]
    pub github_token_env_var: Option<String>,

    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    #[serde(default = "default_settle_delay")]
    pub settle_delay_secs: u64,
    #[serde(default)]
    pub command_timeout_secs: Option<u64>,
    #[serde(default = "default_shell")]
    pub shell: String,
    #[serde(default = "default_sops_binary")]
    pub sops_binary: String,
    #[serde(default = "default_git_binary")]
    pub git_binary: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_clone_base_url")]
    pub clone_base_url: String,

    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_interval() -> u64 {
    60
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_settle_delay() -> u64 {
    5
}

fn default_shell() -> String {
    "bash".to_string()
}

fn default_sops_binary() -> String {
    "sops".to_string()
}

fn default_git_binary() -> String {
    "git".to_string()
}

fn default_api_base_url() -> String {
    DEFAULT_API_BASE_URL.to_string()
}

fn default_clone_base_url() -> String {
    DEFAULT_CLONE_BASE_URL.to_string()
}

impl Config {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_secs(self.settle_delay_secs)
    }

    /// Upper bound for every subprocess; `None` waits indefinitely.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.command_timeout_secs.map(Duration::from_secs)
    }

    /// Monitored subpath as `a/b`, with `.` segments and surrounding
    /// slashes dropped. Empty for the whole repository.
    pub fn path_scope(&self) -> String {
        Path::new(&self.monitor_path)
            .components()
            .filter_map(|c| match c {
                Component::Normal(segment) => segment.to_str(),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn github_token(&self) -> Result<SecretString, ConfigError> {
        resolve_secret(
            self.github_token.as_deref(),
            self.github_token_file.as_deref(),
            self.github_token_env_var.as_deref(),
        )
        .map_err(|source| ConfigError::Secret {
            name: "GitHub token",
            source,
        })
    }

    /// The age key, or `None` when decryption is not configured.
    pub fn age_key(&self) -> Result<Option<SecretString>, ConfigError> {
        resolve_secret_optional(
            self.age_secret.as_deref(),
            self.age_secret_file.as_deref(),
            self.age_secret_env_var.as_deref(),
        )
        .map_err(|source| ConfigError::Secret {
            name: "age secret",
            source,
        })
    }
}

fn redacted(value: &Option<String>) -> Option<&'static str> {
    value.as_ref().map(|_| "****")
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("monitor_path", &self.monitor_path)
            .field("interval", &self.interval)
            .field("script", &self.script)
            .field("age_secret", &redacted(&self.age_secret))
            .field("age_secret_file", &self.age_secret_file)
            .field("age_secret_env_var", &self.age_secret_env_var)
            .field("github_token", &redacted(&self.github_token))
            .field("github_token_file", &self.github_token_file)
            .field("github_token_env_var", &self.github_token_env_var)
            .field("data_dir", &self.data_dir)
            .field("settle_delay_secs", &self.settle_delay_secs)
            .field("command_timeout_secs", &self.command_timeout_secs)
            .field("shell", &self.shell)
            .field("sops_binary", &self.sops_binary)
            .field("git_binary", &self.git_binary)
            .field("api_base_url", &self.api_base_url)
            .field("clone_base_url", &self.clone_base_url)
            .field("logging", &self.logging)
            .finish()
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
    #[serde(default)]
    pub log_to_file: bool,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_file_path: None,
            log_to_file: false,
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{}' (expected text or json)", other)),
        }
    }
}
