//! Materializing a fresh checkout of the monitored repository.

use std::path::Path;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use tokio::process::Command;

use super::auth::build_auth_env;
use crate::gitops::error::{ReconcileError, Result};
use crate::process::run_captured;
use crate::sanitize::{redact_repo_url, redact_secret};

/// Public GitHub clone endpoint.
pub const DEFAULT_CLONE_BASE_URL: &str = "https://github.com";

/// Capability: produce a full working copy of `owner/repo` at `destination`.
///
/// `destination` must not exist yet; its parent does.
#[async_trait::async_trait]
pub trait Checkout: Send + Sync {
    async fn checkout(&self, owner: &str, repo: &str, destination: &Path) -> Result<()>;
}

/// `git clone` over HTTPS with the token supplied through askpass.
pub struct GitCheckout {
    git_binary: String,
    base_url: String,
    token: Option<SecretString>,
    timeout: Option<Duration>,
}

impl GitCheckout {
    pub fn new(token: Option<SecretString>) -> Self {
        Self {
            git_binary: "git".to_string(),
            base_url: DEFAULT_CLONE_BASE_URL.to_string(),
            token,
            timeout: None,
        }
    }

    pub fn with_git_binary(mut self, git_binary: impl Into<String>) -> Self {
        self.git_binary = git_binary.into();
        self
    }

    /// Clone from somewhere other than github.com (GitHub Enterprise, `file://` in tests).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// Clone URL for a repository. The `git` user makes git ask for the
    /// password only, which askpass answers with the token.
    pub fn clone_url(&self, owner: &str, repo: &str) -> String {
        let base = match (&self.token, self.base_url.split_once("://")) {
            (Some(_), Some((scheme, rest))) if scheme.starts_with("http") => {
                format!("{}://git@{}", scheme, rest)
            }
            _ => self.base_url.clone(),
        };
        format!("{}/{}/{}.git", base, owner, repo)
    }

    fn scrub(&self, text: &str) -> String {
        match &self.token {
            Some(token) => redact_secret(text, token.expose_secret()),
            None => text.to_string(),
        }
    }
}

#[async_trait::async_trait]
impl Checkout for GitCheckout {
    async fn checkout(&self, owner: &str, repo: &str, destination: &Path) -> Result<()> {
        let url = self.clone_url(owner, repo);
        log::info!(
            "Cloning {} into {}",
            redact_repo_url(&url),
            destination.display()
        );

        let auth = build_auth_env(self.token.as_ref()).map_err(|e| ReconcileError::Checkout {
            output: format!("Failed to prepare git credentials: {}", e),
        })?;

        let mut cmd = Command::new(&self.git_binary);
        cmd.arg("clone").arg(&url).arg(destination);
        for (key, value) in &auth.env_vars {
            cmd.env(key, value);
        }

        let result = run_captured(cmd, self.timeout).await;

        // Drop auth env (cleanup guard) after command completes
        drop(auth);

        let output = result.map_err(|e| ReconcileError::Checkout {
            output: e.to_string(),
        })?;

        if output.success() {
            Ok(())
        } else {
            Err(ReconcileError::Checkout {
                output: self.scrub(&output.combined()),
            })
        }
    }
}
