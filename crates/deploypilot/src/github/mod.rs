//! Remote revision queries.
//!
//! The monitor only needs one capability from the remote side: "what is the
//! newest revision touching this path?". [`RevisionSource`] models it;
//! [`GithubClient`] answers it through the GitHub REST API.

pub mod client;
pub mod error;
pub mod types;

pub use client::{GithubClient, DEFAULT_API_BASE_URL};
pub use error::RevisionError;
pub use types::RevisionRecord;

/// Source of the newest revision for a path scope.
///
/// An empty `path_scope` means the whole repository. Every call is a fresh
/// query; implementations do not cache.
#[async_trait::async_trait]
pub trait RevisionSource: Send + Sync {
    async fn fetch_latest(&self, path_scope: &str) -> error::Result<RevisionRecord>;
}
