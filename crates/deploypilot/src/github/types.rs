//! Revision data types and the GitHub payloads they are decoded from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single revision of the monitored repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevisionRecord {
    /// Opaque revision identifier (commit SHA).
    pub id: String,
    /// Commit author name.
    pub author_name: String,
    /// Commit author email.
    pub author_email: String,
    /// Author timestamp.
    pub timestamp: DateTime<Utc>,
    /// Full commit message.
    pub message: String,
    /// Link to the commit in the web UI.
    pub url: String,
}

impl RevisionRecord {
    /// First seven characters of the identifier, for log lines.
    pub fn short_id(&self) -> &str {
        match self.id.char_indices().nth(7) {
            Some((idx, _)) => &self.id[..idx],
            None => &self.id,
        }
    }

    /// First line of the commit message.
    pub fn summary(&self) -> &str {
        self.message.lines().next().unwrap_or_default()
    }
}

/// Entry of `GET /repos/{owner}/{repo}/commits`.
#[derive(Debug, Clone, Deserialize)]
pub struct CommitSummary {
    pub sha: String,
    pub commit: CommitDetail,
    #[serde(default)]
    pub html_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitDetail {
    pub author: CommitAuthor,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CommitAuthor {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub date: DateTime<Utc>,
}

impl From<CommitSummary> for RevisionRecord {
    fn from(summary: CommitSummary) -> Self {
        Self {
            id: summary.sha,
            author_name: summary.commit.author.name,
            author_email: summary.commit.author.email,
            timestamp: summary.commit.author.date,
            message: summary.commit.message,
            url: summary.html_url,
        }
    }
}
