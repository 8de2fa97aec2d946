//! Process-wide logging setup.
//!
//! Everything is written through `tracing`. Library code that uses the `log`
//! macros is bridged in with [`tracing_log::LogTracer`]. Output always goes
//! to stdout and, when enabled, is appended to a log file as well.

use std::fs::{File, OpenOptions};
use std::path::Path;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Layer, Registry};

use crate::config::{LogFormat, LoggingConfig};
use crate::error::ConfigError;

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Maps a configured level name to a tracing level. Unknown names fall back to info.
pub fn parse_level(level: &str) -> Level {
    match level.trim().to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// Installs the global subscriber. `RUST_LOG` takes precedence over the
/// configured level.
///
/// A log file that cannot be opened is reported on stderr and skipped.
pub fn init_logging(config: &LoggingConfig) -> Result<(), ConfigError> {
    let level = parse_level(&config.log_level);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string().to_lowercase()));

    let mut layers: Vec<BoxedLayer> = vec![stdout_layer(config.format)];

    if config.log_to_file {
        if let Some(path) = config.log_file_path.as_deref() {
            match open_log_file(path) {
                Ok(file) => layers.push(file_layer(config.format, file)),
                Err(e) => eprintln!("Failed to open log file '{}': {}", path.display(), e),
            }
        }
    }

    let subscriber = Registry::default().with(layers).with(filter);

    tracing_log::LogTracer::init().map_err(|e| ConfigError::Logging(e.to_string()))?;
    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| ConfigError::Logging(e.to_string()))?;

    Ok(())
}

fn stdout_layer(format: LogFormat) -> BoxedLayer {
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_writer(std::io::stdout)
            .boxed(),
        LogFormat::Text => fmt::layer().with_writer(std::io::stdout).boxed(),
    }
}

fn file_layer(format: LogFormat, file: File) -> BoxedLayer {
    let writer = Mutex::new(file);
    match format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
            .boxed(),
        LogFormat::Text => fmt::layer().with_ansi(false).with_writer(writer).boxed(),
    }
}

fn open_log_file(path: &Path) -> std::io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    OpenOptions::new().create(true).append(true).open(path)
}
