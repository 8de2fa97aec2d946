//! Change detection and the reconciliation pipeline.
//!
//! - [`poll_loop`] watches the remote and decides when to deploy.
//! - [`reconciler`] runs checkout → stage → decrypt → execute.
//! - [`progress`] defines the activity events every component reports.

pub mod decrypt;
pub mod error;
pub mod executor;
pub mod git;
pub mod poll_loop;
pub mod progress;
pub mod reconciler;
pub mod workspace;

pub use decrypt::{
    DecryptError, DecryptReport, Decryptor, FileOutcome, SecretResolver, SopsDecryptor,
};
pub use error::{ReconcileError, Result};
pub use executor::{Executor, SCRIPT_PREAMBLE};
pub use git::{Checkout, GitCheckout, DEFAULT_CLONE_BASE_URL};
pub use poll_loop::{
    LoopPhase, MonitorState, PollLoop, ReconcileToken, RevisionHandler, ShutdownHandle,
    TickOutcome,
};
pub use progress::{ActivityEvent, ActivityReporter, MemoryReporter, ReconcileStage};
pub use reconciler::{DeployHandler, ReconcileContext, ReconcileReport, Reconciler};
pub use workspace::Workspace;
