//! Test harness for running reconciliations in isolation.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use tempfile::TempDir;

use deploypilot::gitops::{Decryptor, MemoryReporter};
use deploypilot::{
    Checkout, Executor, ReconcileContext, Reconciler, SecretResolver, Workspace,
};

use super::fakes::{FakeDecryptor, AGE_KEY};

pub struct TestHarness {
    temp_dir: TempDir,
    /// Data directory handed to the workspace.
    pub data_dir: PathBuf,
    pub reporter: Arc<MemoryReporter>,
    pub decryptor: Arc<FakeDecryptor>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let data_dir = temp_dir.path().join("data");

        Self {
            temp_dir,
            data_dir,
            reporter: Arc::new(MemoryReporter::new()),
            decryptor: Arc::new(FakeDecryptor::default()),
        }
    }

    pub fn temp_path(&self) -> &std::path::Path {
        self.temp_dir.path()
    }

    pub fn workspace(&self) -> Workspace {
        Workspace::new(self.data_dir.clone())
    }

    pub fn reconciler(&self, checkout: Arc<dyn Checkout>) -> Reconciler {
        self.reconciler_with_decryptor(checkout, self.decryptor.clone())
    }

    pub fn reconciler_with_decryptor(
        &self,
        checkout: Arc<dyn Checkout>,
        decryptor: Arc<dyn Decryptor>,
    ) -> Reconciler {
        Reconciler::new(
            self.workspace(),
            checkout,
            SecretResolver::new(decryptor, self.reporter.clone()),
            Executor::new("bash", Some(Duration::from_secs(30)), self.reporter.clone()),
            self.reporter.clone(),
        )
        .with_settle_delay(Duration::ZERO)
    }

    pub fn context(&self, monitor_path: &str, script: &str) -> ReconcileContext {
        ReconcileContext {
            owner: "acme".to_string(),
            repo: "infra".to_string(),
            monitor_path: monitor_path.to_string(),
            decryption_key: Some(SecretString::from(AGE_KEY.to_string())),
            script: script.to_string(),
        }
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}
