//! GitHub REST client for the latest commit on a path.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};

use super::error::{Result, RevisionError};
use super::types::{CommitSummary, RevisionRecord};
use super::RevisionSource;
use crate::sanitize::truncate_body;

/// Public GitHub API endpoint.
pub const DEFAULT_API_BASE_URL: &str = "https://api.github.com";

/// Per-request timeout.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Queries `GET /repos/{owner}/{repo}/commits` for the newest commit.
pub struct GithubClient {
    http: Client,
    base_url: String,
    owner: String,
    repo: String,
    token: Option<SecretString>,
}

impl GithubClient {
    /// Creates a client against a custom API endpoint (GitHub Enterprise, tests).
    pub fn with_base_url(
        base_url: impl Into<String>,
        owner: impl Into<String>,
        repo: impl Into<String>,
        token: Option<SecretString>,
    ) -> Result<Self> {
        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("deploypilot/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            owner: owner.into(),
            repo: repo.into(),
            token,
        })
    }

    fn commits_url(&self) -> String {
        format!("{}/repos/{}/{}/commits", self.base_url, self.owner, self.repo)
    }
}

#[async_trait::async_trait]
impl RevisionSource for GithubClient {
    async fn fetch_latest(&self, path_scope: &str) -> Result<RevisionRecord> {
        let mut request = self
            .http
            .get(self.commits_url())
            .header("Accept", "application/vnd.github.v3+json")
            .query(&[("per_page", "1")]);

        if !path_scope.is_empty() {
            request = request.query(&[("path", path_scope)]);
        }

        if let Some(token) = &self.token {
            request = request.header("Authorization", format!("token {}", token.expose_secret()));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RevisionError::Transient(format!("failed to send request: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RevisionError::Transient(format!(
                "GitHub API returned status {}: {}",
                status.as_u16(),
                truncate_body(&body)
            )));
        }

        let commits: Vec<CommitSummary> = response
            .json()
            .await
            .map_err(|e| RevisionError::Transient(format!("failed to decode response: {}", e)))?;

        commits
            .into_iter()
            .next()
            .map(RevisionRecord::from)
            .ok_or_else(|| RevisionError::NotFound {
                path: path_scope.to_string(),
            })
    }
}
