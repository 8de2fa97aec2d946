//! Git authentication handling.
//!
//! The access token is handed to git through a throwaway `GIT_ASKPASS`
//! script so it never appears in the clone URL, the process list, or the
//! captured output.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};

/// Escapes a token for safe use in single-quoted shell strings.
/// Replaces single quotes with '\'' (end quote, escaped quote, start quote).
pub fn shell_escape_token(token: &str) -> String {
    token.replace('\'', "'\\''")
}

/// RAII guard for askpass script cleanup.
///
/// Deletes the askpass script when dropped, so the token is not left on
/// disk even if the clone fails.
#[derive(Debug)]
pub struct AskpassCleanup {
    path: Option<PathBuf>,
}

impl AskpassCleanup {
    pub(crate) fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    pub(crate) fn empty() -> Self {
        Self { path: None }
    }

    /// Path of the askpass script, if one was written.
    pub fn path(&self) -> Option<&PathBuf> {
        self.path.as_ref()
    }
}

impl Drop for AskpassCleanup {
    fn drop(&mut self) {
        if let Some(path) = self.path.take() {
            if let Err(e) = std::fs::remove_file(&path) {
                log::warn!("Failed to clean up askpass script: {}", e);
            }
        }
    }
}

/// Authentication environment for git commands.
#[derive(Debug)]
pub struct AuthEnv {
    /// Environment variables to set for the git command.
    pub env_vars: Vec<(String, String)>,
    /// Must outlive the git command to keep the askpass script alive.
    pub _cleanup: AskpassCleanup,
}

/// Builds the git environment for an optional access token.
///
/// Without a token, only interactive prompting is disabled.
pub fn build_auth_env(token: Option<&SecretString>) -> std::io::Result<AuthEnv> {
    let mut env = vec![("GIT_TERMINAL_PROMPT".to_string(), "0".to_string())];

    let Some(token) = token else {
        return Ok(AuthEnv {
            env_vars: env,
            _cleanup: AskpassCleanup::empty(),
        });
    };

    let escaped_token = shell_escape_token(token.expose_secret());
    let askpass_path =
        std::env::temp_dir().join(format!(".deploypilot-askpass-{}.sh", uuid::Uuid::new_v4()));
    let askpass_script = format!("#!/bin/sh\necho '{}'\n", escaped_token);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        let mut file = std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o700)
            .open(&askpass_path)?;
        std::io::Write::write_all(&mut file, askpass_script.as_bytes())?;
    }

    #[cfg(not(unix))]
    {
        std::fs::write(&askpass_path, &askpass_script)?;
    }

    let cleanup = AskpassCleanup::new(askpass_path.clone());

    let askpass_path_str = askpass_path
        .to_str()
        .ok_or_else(|| {
            std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Temp directory path contains non-UTF8 characters",
            )
        })?
        .to_string();

    env.push(("GIT_ASKPASS".to_string(), askpass_path_str));

    Ok(AuthEnv {
        env_vars: env,
        _cleanup: cleanup,
    })
}
