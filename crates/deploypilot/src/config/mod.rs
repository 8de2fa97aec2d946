pub mod loader;
pub mod schema;

pub use loader::{apply_env_overrides, load_config, load_config_from_str, DEFAULT_CONFIG_PATH};
pub use schema::{Config, LogFormat, LoggingConfig};
