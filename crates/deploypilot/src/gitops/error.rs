//! Reconciliation error types.

use std::path::PathBuf;
use thiserror::Error;

use super::progress::ReconcileStage;

/// Errors that abort a reconciliation run.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Filesystem operation on '{path}' failed: {source}")]
    Filesystem {
        stage: ReconcileStage,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("git clone failed: {output}")]
    Checkout { output: String },

    #[error("Failed to stage '{from}' into '{to}': {reason}")]
    Staging {
        from: PathBuf,
        to: PathBuf,
        reason: String,
    },

    #[error("Failed to walk staging directory: {0}")]
    Traversal(#[from] walkdir::Error),

    #[error("Script execution failed{}: {output}", exit_suffix(.exit_code))]
    Execution {
        exit_code: Option<i32>,
        output: String,
    },
}

fn exit_suffix(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!(" with exit code {}", code),
        None => String::new(),
    }
}

impl ReconcileError {
    /// The stage the error aborted.
    pub fn stage(&self) -> ReconcileStage {
        match self {
            ReconcileError::Filesystem { stage, .. } => *stage,
            ReconcileError::Checkout { .. } => ReconcileStage::Checkout,
            ReconcileError::Staging { .. } => ReconcileStage::Stage,
            ReconcileError::Traversal(_) => ReconcileStage::Decrypt,
            ReconcileError::Execution { .. } => ReconcileStage::Execute,
        }
    }

    /// Captured subprocess output attached to the error, if any.
    pub fn output(&self) -> Option<&str> {
        match self {
            ReconcileError::Checkout { output } | ReconcileError::Execution { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }

    pub(crate) fn filesystem(
        stage: ReconcileStage,
        path: impl Into<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        ReconcileError::Filesystem {
            stage,
            path: path.into(),
            source,
        }
    }
}

/// Result type for reconciliation.
pub type Result<T> = std::result::Result<T, ReconcileError>;
