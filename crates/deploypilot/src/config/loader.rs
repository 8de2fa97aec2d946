use std::path::{Component, Path};

use crate::config::schema::{Config, LoggingConfig};
use crate::error::ConfigError;
use crate::secrets::has_secret_source;

/// Used when neither `--config` nor `CONFIG_PATH` is given.
pub const DEFAULT_CONFIG_PATH: &str = "config.yaml";

/// Reads, parses and validates the YAML file at `path`, then applies the
/// logging environment overrides.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config = parse(&content, path)?;
    apply_env_overrides(&mut config.logging);
    validate_config(&config)?;

    Ok(config)
}

/// Parses and validates YAML content. Environment overrides are not applied.
pub fn load_config_from_str(content: &str) -> Result<Config, ConfigError> {
    let config = parse(content, Path::new("<inline>"))?;
    validate_config(&config)?;
    Ok(config)
}

fn parse(content: &str, path: &Path) -> Result<Config, ConfigError> {
    serde_yaml::from_str(content).map_err(|e| ConfigError::ParseYaml {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// `LOG_FILE_PATH` (which also turns file logging on), `LOG_LEVEL` and
/// `LOG_TO_FILE` take precedence over the file.
pub fn apply_env_overrides(logging: &mut LoggingConfig) {
    if let Some(path) = non_empty_env("LOG_FILE_PATH") {
        logging.log_file_path = Some(path.into());
        logging.log_to_file = true;
    }

    if let Some(level) = non_empty_env("LOG_LEVEL") {
        logging.log_level = level;
    }

    if let Some(flag) = non_empty_env("LOG_TO_FILE") {
        match flag.to_lowercase().as_str() {
            "true" | "1" => logging.log_to_file = true,
            "false" | "0" => logging.log_to_file = false,
            other => log::warn!("Ignoring LOG_TO_FILE={:?}, expected true or false", other),
        }
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.owner.trim().is_empty() {
        return Err(validation("owner is required"));
    }

    if config.repo.trim().is_empty() {
        return Err(validation("repo is required"));
    }

    if config.interval == 0 {
        return Err(validation("interval must be greater than 0 seconds"));
    }

    if !has_secret_source(
        config.github_token.as_deref(),
        config.github_token_file.as_deref(),
        config.github_token_env_var.as_deref(),
    ) {
        return Err(validation(
            "one of githubToken, githubTokenFile or githubTokenEnvVar is required",
        ));
    }

    let monitor_path = Path::new(&config.monitor_path);
    if monitor_path.is_absolute() || config.monitor_path.starts_with('/') {
        return Err(ConfigError::Validation {
            message: format!(
                "monitorPath '{}' must be relative to the repository root",
                config.monitor_path
            ),
        });
    }

    if monitor_path
        .components()
        .any(|c| matches!(c, Component::ParentDir))
    {
        return Err(ConfigError::Validation {
            message: format!("monitorPath '{}' must not contain '..'", config.monitor_path),
        });
    }

    if config.shell.trim().is_empty() {
        return Err(validation("shell must not be empty"));
    }

    Ok(())
}

fn validation(message: &str) -> ConfigError {
    ConfigError::Validation {
        message: message.to_string(),
    }
}
