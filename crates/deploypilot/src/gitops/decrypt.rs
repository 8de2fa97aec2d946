//! In-place decryption of the staged tree.
//!
//! Every regular file is offered to the [`Decryptor`]. Files it cannot
//! decrypt are assumed to be plaintext and left untouched.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tokio::process::Command;
use walkdir::WalkDir;

use super::error::Result;
use super::progress::{ActivityEvent, ActivityReporter};
use crate::process::{run_captured, ProcessError};

/// Why a single file was not decrypted.
#[derive(Error, Debug)]
pub enum DecryptError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error("decryption rejected: {output}")]
    Rejected { output: String },
}

/// Capability: decrypt one file in place with the given key.
#[async_trait::async_trait]
pub trait Decryptor: Send + Sync {
    async fn decrypt_in_place(
        &self,
        path: &Path,
        key: &SecretString,
    ) -> std::result::Result<(), DecryptError>;
}

/// `sops -d -i <file>` with the age key passed in `SOPS_AGE_KEY`.
pub struct SopsDecryptor {
    binary: String,
    timeout: Option<Duration>,
}

impl SopsDecryptor {
    pub fn new(binary: impl Into<String>, timeout: Option<Duration>) -> Self {
        Self {
            binary: binary.into(),
            timeout,
        }
    }
}

impl Default for SopsDecryptor {
    fn default() -> Self {
        Self::new("sops", None)
    }
}

#[async_trait::async_trait]
impl Decryptor for SopsDecryptor {
    async fn decrypt_in_place(
        &self,
        path: &Path,
        key: &SecretString,
    ) -> std::result::Result<(), DecryptError> {
        let mut cmd = Command::new(&self.binary);
        cmd.args(["-d", "-i"])
            .arg(path)
            .env("SOPS_AGE_KEY", key.expose_secret());

        let output = run_captured(cmd, self.timeout).await?;
        if output.success() {
            Ok(())
        } else {
            Err(DecryptError::Rejected {
                output: output.combined(),
            })
        }
    }
}

/// What happened to one staged file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Decrypted,
    /// Not decryptable with the key; treated as plaintext.
    Skipped,
}

/// Files touched by a decrypt pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecryptReport {
    pub decrypted: Vec<PathBuf>,
    pub skipped: Vec<PathBuf>,
}

impl DecryptReport {
    fn record(&mut self, path: PathBuf, outcome: FileOutcome) {
        match outcome {
            FileOutcome::Decrypted => self.decrypted.push(path),
            FileOutcome::Skipped => self.skipped.push(path),
        }
    }
}

/// Walks the staging area and decrypts what it can.
pub struct SecretResolver {
    decryptor: Arc<dyn Decryptor>,
    reporter: Arc<dyn ActivityReporter>,
}

impl SecretResolver {
    pub fn new(decryptor: Arc<dyn Decryptor>, reporter: Arc<dyn ActivityReporter>) -> Self {
        Self {
            decryptor,
            reporter,
        }
    }

    /// Decrypts every regular file under `root` in place.
    ///
    /// Per-file failures are recorded as [`FileOutcome::Skipped`]; only a
    /// failure to traverse the tree is an error. Without a key nothing is
    /// attempted.
    pub async fn decrypt_all(
        &self,
        root: &Path,
        key: Option<&SecretString>,
    ) -> Result<DecryptReport> {
        let mut report = DecryptReport::default();

        let Some(key) = key else {
            log::info!("No decryption key configured, skipping decryption");
            return Ok(report);
        };

        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }

            let path = entry.into_path();
            let outcome = self.decrypt_file(&path, key).await;
            report.record(path, outcome);
        }

        Ok(report)
    }

    async fn decrypt_file(&self, path: &Path, key: &SecretString) -> FileOutcome {
        match self.decryptor.decrypt_in_place(path, key).await {
            Ok(()) => {
                self.reporter.report(ActivityEvent::FileDecrypted {
                    path: path.display().to_string(),
                });
                FileOutcome::Decrypted
            }
            Err(e) => {
                log::debug!("{} left as-is: {}", path.display(), e);
                FileOutcome::Skipped
            }
        }
    }
}
