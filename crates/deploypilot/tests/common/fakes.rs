//! Deterministic stand-ins for the external collaborators.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};

use deploypilot::github::error::Result as RevisionResult;
use deploypilot::gitops::poll_loop::{ReconcileToken, ShutdownHandle};
use deploypilot::gitops::{DecryptError, Decryptor};
use deploypilot::{
    Checkout, ReconcileError, RevisionError, RevisionHandler, RevisionRecord, RevisionSource,
};

/// Marker prefix for files the fake decryptor can decrypt.
pub const ENCRYPTED_PREFIX: &str = "ENC[";
pub const AGE_KEY: &str = "AGE-SECRET-KEY-1FAKE";

pub fn revision(id: &str) -> RevisionRecord {
    RevisionRecord {
        id: id.to_string(),
        author_name: "Octo Cat".to_string(),
        author_email: "octo@example.com".to_string(),
        timestamp: chrono::Utc::now(),
        message: format!("Deploy {}\n\nDetails", id),
        url: format!("https://github.com/acme/infra/commit/{}", id),
    }
}

/// Answers `fetch_latest` from a fixed script of responses.
///
/// Once the script is exhausted every call fails.
pub struct ScriptedSource {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
    scopes: Mutex<Vec<String>>,
}

impl ScriptedSource {
    pub fn new(responses: &[Result<&str, &str>]) -> Self {
        Self {
            responses: Mutex::new(
                responses
                    .iter()
                    .map(|r| r.map(str::to_string).map_err(str::to_string))
                    .collect(),
            ),
            calls: AtomicUsize::new(0),
            scopes: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn scopes(&self) -> Vec<String> {
        self.scopes.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RevisionSource for ScriptedSource {
    async fn fetch_latest(&self, path_scope: &str) -> RevisionResult<RevisionRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.scopes.lock().unwrap().push(path_scope.to_string());

        match self.responses.lock().unwrap().pop_front() {
            Some(Ok(id)) => Ok(revision(&id)),
            Some(Err(message)) => Err(RevisionError::Transient(message)),
            None => Err(RevisionError::Transient("no more responses".to_string())),
        }
    }
}

/// Records every revision it is asked to handle.
#[derive(Default)]
pub struct RecordingHandler {
    seen: Mutex<Vec<String>>,
    fail: bool,
    token: Mutex<Option<ReconcileToken>>,
    token_held: Mutex<Vec<bool>>,
    stop_after: Mutex<Option<(usize, ShutdownHandle)>>,
}

impl RecordingHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Observe `token` from inside `handle`.
    pub fn watch_token(&self, token: ReconcileToken) {
        *self.token.lock().unwrap() = Some(token);
    }

    /// Stop the loop once `count` revisions were handled.
    pub fn stop_after(&self, count: usize, shutdown: ShutdownHandle) {
        *self.stop_after.lock().unwrap() = Some((count, shutdown));
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }

    pub fn token_held(&self) -> Vec<bool> {
        self.token_held.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl RevisionHandler for RecordingHandler {
    async fn handle(&self, revision: &RevisionRecord) -> Result<(), ReconcileError> {
        let handled = {
            let mut seen = self.seen.lock().unwrap();
            seen.push(revision.id.clone());
            seen.len()
        };

        if let Some(token) = self.token.lock().unwrap().as_ref() {
            self.token_held.lock().unwrap().push(token.is_held());
        }

        if let Some((count, shutdown)) = self.stop_after.lock().unwrap().as_ref() {
            if handled >= *count {
                shutdown.stop();
            }
        }

        if self.fail {
            Err(ReconcileError::Execution {
                exit_code: Some(1),
                output: "deployment failed".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

/// Writes a fixed file tree instead of cloning, or fails like a bad clone.
pub struct FakeCheckout {
    files: Vec<(String, String)>,
    failure: Option<String>,
    calls: AtomicUsize,
}

impl FakeCheckout {
    pub fn with_files(files: &[(&str, &str)]) -> Self {
        Self {
            files: files
                .iter()
                .map(|(path, content)| (path.to_string(), content.to_string()))
                .collect(),
            failure: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(output: &str) -> Self {
        Self {
            files: Vec::new(),
            failure: Some(output.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Checkout for FakeCheckout {
    async fn checkout(
        &self,
        _owner: &str,
        _repo: &str,
        destination: &Path,
    ) -> Result<(), ReconcileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        assert!(!destination.exists(), "checkout target must be fresh");

        if let Some(output) = &self.failure {
            return Err(ReconcileError::Checkout {
                output: output.clone(),
            });
        }

        std::fs::create_dir_all(destination).unwrap();
        for (path, content) in &self.files {
            let target = destination.join(path);
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent).unwrap();
            }
            std::fs::write(target, content).unwrap();
        }
        Ok(())
    }
}

/// Strips [`ENCRYPTED_PREFIX`] from files when given [`AGE_KEY`].
#[derive(Default)]
pub struct FakeDecryptor {
    attempts: AtomicUsize,
}

impl FakeDecryptor {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Decryptor for FakeDecryptor {
    async fn decrypt_in_place(&self, path: &Path, key: &SecretString) -> Result<(), DecryptError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let content = std::fs::read_to_string(path).unwrap_or_default();
        match content.strip_prefix(ENCRYPTED_PREFIX) {
            Some(plain) if key.expose_secret() == AGE_KEY => {
                std::fs::write(path, plain).unwrap();
                Ok(())
            }
            _ => Err(DecryptError::Rejected {
                output: "Error unmarshalling input: sops metadata not found".to_string(),
            }),
        }
    }
}

/// Deletes `victim` on its first call, so a tree walk in progress can no
/// longer open it. Every file is otherwise left as plaintext.
pub struct PruningDecryptor {
    victim: PathBuf,
    attempts: AtomicUsize,
}

impl PruningDecryptor {
    pub fn new(victim: impl Into<PathBuf>) -> Self {
        Self {
            victim: victim.into(),
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Decryptor for PruningDecryptor {
    async fn decrypt_in_place(
        &self,
        _path: &Path,
        _key: &SecretString,
    ) -> Result<(), DecryptError> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            std::fs::remove_dir_all(&self.victim).unwrap();
        }
        Err(DecryptError::Rejected {
            output: "sops metadata not found".to_string(),
        })
    }
}
