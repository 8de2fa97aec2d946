use std::path::PathBuf;
use thiserror::Error;

use crate::github::RevisionError;
use crate::secrets::SecretError;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {message}")]
    ParseYaml { path: PathBuf, message: String },

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Failed to resolve {name}: {source}")]
    Secret {
        name: &'static str,
        #[source]
        source: SecretError,
    },

    #[error("Failed to initialize logging: {0}")]
    Logging(String),
}

/// The monitor could not establish its baseline revision.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Failed to get initial commit: {0}")]
    Baseline(#[source] RevisionError),
}

pub type Result<T> = std::result::Result<T, ConfigError>;
