//! Reconciler: clear → settle → checkout → stage → cleanup → decrypt → execute.
//!
//! Each run starts from a clean slate. The first failing stage aborts the
//! rest and is returned to the caller; nothing is rolled back.

use std::sync::Arc;
use std::time::Duration;

use secrecy::SecretString;
use serde::Serialize;
use tracing::Instrument;

use super::decrypt::{DecryptReport, SecretResolver};
use super::error::Result;
use super::executor::Executor;
use super::git::Checkout;
use super::poll_loop::RevisionHandler;
use super::progress::{ActivityEvent, ActivityReporter, ReconcileStage};
use super::workspace::Workspace;
use crate::github::RevisionRecord;

/// Everything a reconciliation needs to know about its target.
#[derive(Debug, Clone)]
pub struct ReconcileContext {
    pub owner: String,
    pub repo: String,
    /// Subpath to stage; empty for the whole repository.
    pub monitor_path: String,
    pub decryption_key: Option<SecretString>,
    pub script: String,
}

/// Result of a successful reconciliation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconcileReport {
    #[serde(skip)]
    pub decrypt: DecryptReport,
    pub decrypted_files: usize,
    pub skipped_files: usize,
    /// Combined stdout/stderr of the deployment script.
    pub output: String,
}

/// Runs the reconciliation pipeline against a [`Workspace`].
pub struct Reconciler {
    workspace: Workspace,
    checkout: Arc<dyn Checkout>,
    resolver: SecretResolver,
    executor: Executor,
    settle_delay: Duration,
    reporter: Arc<dyn ActivityReporter>,
}

impl Reconciler {
    pub fn new(
        workspace: Workspace,
        checkout: Arc<dyn Checkout>,
        resolver: SecretResolver,
        executor: Executor,
        reporter: Arc<dyn ActivityReporter>,
    ) -> Self {
        Self {
            workspace,
            checkout,
            resolver,
            executor,
            settle_delay: Duration::from_secs(5),
            reporter,
        }
    }

    /// Time to wait between clearing the workspace and cloning.
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn workspace(&self) -> &Workspace {
        &self.workspace
    }

    pub async fn reconcile(&self, ctx: &ReconcileContext) -> Result<ReconcileReport> {
        let span = tracing::info_span!(
            "reconcile",
            owner = %ctx.owner,
            repo = %ctx.repo,
            path = %ctx.monitor_path
        );
        self.run_stages(ctx).instrument(span).await
    }

    async fn run_stages(&self, ctx: &ReconcileContext) -> Result<ReconcileReport> {
        let ws = &self.workspace;

        self.enter(ReconcileStage::Prepare).in_scope(|| {
            ws.ensure_root()?;
            ws.clear(&ctx.repo)
        })?;

        ws.settle(self.settle_delay)
            .instrument(self.enter(ReconcileStage::Settle))
            .await;

        let checkout_dir = ws.checkout_dir(&ctx.repo);
        self.checkout
            .checkout(&ctx.owner, &ctx.repo, &checkout_dir)
            .instrument(self.enter(ReconcileStage::Checkout))
            .await?;

        let staging = self
            .enter(ReconcileStage::Stage)
            .in_scope(|| ws.stage(&ctx.repo, &ctx.monitor_path))?;

        self.enter(ReconcileStage::Cleanup)
            .in_scope(|| ws.remove_checkout(&ctx.repo))?;

        let decrypt = self
            .resolver
            .decrypt_all(&staging, ctx.decryption_key.as_ref())
            .instrument(self.enter(ReconcileStage::Decrypt))
            .await?;

        let output = self
            .executor
            .run(&staging, &ctx.script)
            .instrument(self.enter(ReconcileStage::Execute))
            .await?;

        Ok(ReconcileReport {
            decrypted_files: decrypt.decrypted.len(),
            skipped_files: decrypt.skipped.len(),
            decrypt,
            output,
        })
    }

    fn enter(&self, stage: ReconcileStage) -> tracing::Span {
        self.reporter.report(ActivityEvent::StageStarted { stage });
        tracing::info_span!("stage", stage = %stage)
    }
}

/// Reconciles the configured target on every revision the poll loop detects.
pub struct DeployHandler {
    reconciler: Arc<Reconciler>,
    context: ReconcileContext,
    reporter: Arc<dyn ActivityReporter>,
}

impl DeployHandler {
    pub fn new(
        reconciler: Arc<Reconciler>,
        context: ReconcileContext,
        reporter: Arc<dyn ActivityReporter>,
    ) -> Self {
        Self {
            reconciler,
            context,
            reporter,
        }
    }
}

#[async_trait::async_trait]
impl RevisionHandler for DeployHandler {
    async fn handle(&self, revision: &RevisionRecord) -> Result<()> {
        match self.reconciler.reconcile(&self.context).await {
            Ok(report) => {
                self.reporter.report(ActivityEvent::ReconcileSucceeded {
                    revision: revision.id.clone(),
                    decrypted: report.decrypted_files,
                    skipped: report.skipped_files,
                });
                Ok(())
            }
            Err(e) => {
                self.reporter.report(ActivityEvent::ReconcileFailed {
                    revision: revision.id.clone(),
                    stage: e.stage(),
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }
}
