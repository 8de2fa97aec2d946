pub mod broadcast;
pub mod config;
pub mod error;
pub mod github;
pub mod gitops;
pub mod logging;
pub mod process;
pub mod sanitize;
pub mod secrets;

pub use broadcast::{ActivityBroadcaster, ActivityEntry};
pub use config::{load_config, Config, LogFormat, LoggingConfig};
pub use error::{ConfigError, Result, StartupError};
pub use github::{GithubClient, RevisionError, RevisionRecord, RevisionSource};
pub use gitops::{
    ActivityEvent, ActivityReporter, Checkout, DeployHandler, Executor, GitCheckout, PollLoop,
    ReconcileContext, ReconcileError, Reconciler, RevisionHandler, SecretResolver,
    SopsDecryptor, TickOutcome, Workspace,
};
pub use logging::init_logging;
pub use secrets::{resolve_secret, resolve_secret_optional, SecretError};
