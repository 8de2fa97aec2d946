//! Revision query errors.

use thiserror::Error;

/// Errors returned by a revision query.
#[derive(Error, Debug)]
pub enum RevisionError {
    /// The query succeeded but no commit touches the requested scope.
    #[error("No commits found{}", scope_suffix(.path))]
    NotFound { path: String },

    /// Network, authentication or decoding failure for a single query.
    #[error("Revision query failed: {0}")]
    Transient(String),
}

impl RevisionError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, RevisionError::NotFound { .. })
    }
}

fn scope_suffix(path: &str) -> String {
    if path.is_empty() {
        String::new()
    } else {
        format!(" for path '{}'", path)
    }
}

impl From<reqwest::Error> for RevisionError {
    fn from(err: reqwest::Error) -> Self {
        RevisionError::Transient(err.to_string())
    }
}

/// Result type for revision queries.
pub type Result<T> = std::result::Result<T, RevisionError>;
