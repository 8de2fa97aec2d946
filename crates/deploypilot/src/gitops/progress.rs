//! Activity reporting for the monitor and the reconciliation pipeline.
//!
//! Components never log through a global; they receive an
//! [`ActivityReporter`] and describe what happened as [`ActivityEvent`]s.
//! The production reporter ([`crate::broadcast::ActivityBroadcaster`]) turns
//! events into log lines and fans them out to subscribers, while
//! [`MemoryReporter`] keeps them for assertions in tests.

use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Stage of a reconciliation run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconcileStage {
    /// Creating the data root and clearing prior state.
    Prepare,
    /// Waiting for the filesystem to settle.
    Settle,
    /// Cloning the repository.
    Checkout,
    /// Moving the monitored subtree into the staging area.
    Stage,
    /// Removing the full checkout.
    Cleanup,
    /// Decrypting staged files.
    Decrypt,
    /// Running the deployment script.
    Execute,
}

impl std::fmt::Display for ReconcileStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileStage::Prepare => write!(f, "prepare"),
            ReconcileStage::Settle => write!(f, "settle"),
            ReconcileStage::Checkout => write!(f, "checkout"),
            ReconcileStage::Stage => write!(f, "stage"),
            ReconcileStage::Cleanup => write!(f, "cleanup"),
            ReconcileStage::Decrypt => write!(f, "decrypt"),
            ReconcileStage::Execute => write!(f, "execute"),
        }
    }
}

/// Something a component did that is worth telling the operator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ActivityEvent {
    BaselineEstablished {
        revision: String,
        path_scope: String,
    },
    PollFailed {
        error: String,
    },
    RevisionDetected {
        revision: String,
        author: String,
        message: String,
    },
    StageStarted {
        stage: ReconcileStage,
    },
    FileDecrypted {
        path: String,
    },
    ScriptCompleted {
        output: String,
    },
    ReconcileSucceeded {
        revision: String,
        decrypted: usize,
        skipped: usize,
    },
    ReconcileFailed {
        revision: String,
        stage: ReconcileStage,
        error: String,
    },
}

impl ActivityEvent {
    /// Log level the event is written at.
    pub fn level(&self) -> log::Level {
        match self {
            ActivityEvent::StageStarted { .. } => log::Level::Debug,
            ActivityEvent::PollFailed { .. } => log::Level::Warn,
            ActivityEvent::ReconcileFailed { .. } => log::Level::Error,
            _ => log::Level::Info,
        }
    }

    /// Human-readable log line.
    pub fn message(&self) -> String {
        match self {
            ActivityEvent::BaselineEstablished {
                revision,
                path_scope,
            } => {
                if path_scope.is_empty() {
                    format!("Monitoring started. Initial commit: {}", short(revision))
                } else {
                    format!(
                        "Monitoring started. Initial commit: {} (path: {})",
                        short(revision),
                        path_scope
                    )
                }
            }
            ActivityEvent::PollFailed { error } => {
                format!("Error checking for updates: {}", error)
            }
            ActivityEvent::RevisionDetected {
                revision,
                author,
                message,
            } => format!(
                "New commit detected: sha={} author={} commit_msg={:?}",
                short(revision),
                author,
                message
            ),
            ActivityEvent::StageStarted { stage } => format!("Reconcile stage: {}", stage),
            ActivityEvent::FileDecrypted { path } => format!("File decrypted: {}", path),
            ActivityEvent::ScriptCompleted { output } => {
                format!("Execution done, output:\n{}", output)
            }
            ActivityEvent::ReconcileSucceeded {
                revision,
                decrypted,
                skipped,
            } => format!(
                "Reconciled {} ({} files decrypted, {} left as-is)",
                short(revision),
                decrypted,
                skipped
            ),
            ActivityEvent::ReconcileFailed {
                revision,
                stage,
                error,
            } => format!(
                "Reconcile of {} failed during {}: {}",
                short(revision),
                stage,
                error
            ),
        }
    }
}

fn short(revision: &str) -> &str {
    match revision.char_indices().nth(7) {
        Some((idx, _)) => &revision[..idx],
        None => revision,
    }
}

pub trait ActivityReporter: Send + Sync {
    fn report(&self, event: ActivityEvent);
}

/// Collects every event in memory, in order.
#[derive(Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<ActivityEvent>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events reported so far.
    pub fn events(&self) -> Vec<ActivityEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    /// Stages that were started, in order.
    pub fn stages(&self) -> Vec<ReconcileStage> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                ActivityEvent::StageStarted { stage } => Some(stage),
                _ => None,
            })
            .collect()
    }

    /// Number of events matching `predicate`.
    pub fn count(&self, predicate: impl Fn(&ActivityEvent) -> bool) -> usize {
        self.events().iter().filter(|e| predicate(e)).count()
    }
}

impl ActivityReporter for MemoryReporter {
    fn report(&self, event: ActivityEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
