//! Deployment script execution.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::process::Command;

use super::error::{ReconcileError, Result};
use super::progress::{ActivityEvent, ActivityReporter, ReconcileStage};
use super::workspace::SCRIPT_FILE;
use crate::process::{run_captured, CapturedOutput};

/// Prepended to every script body: stderr is folded into stdout and the
/// working directory is the staging area.
pub const SCRIPT_PREAMBLE: &str = "#!/bin/bash\nexec 2>&1\ncd \"$(dirname \"$0\")\"\n";

/// Runs the user script inside the staging area.
pub struct Executor {
    shell: String,
    timeout: Option<Duration>,
    reporter: Arc<dyn ActivityReporter>,
}

impl Executor {
    pub fn new(
        shell: impl Into<String>,
        timeout: Option<Duration>,
        reporter: Arc<dyn ActivityReporter>,
    ) -> Self {
        Self {
            shell: shell.into(),
            timeout,
            reporter,
        }
    }

    /// Full contents of the generated `script.sh`.
    pub fn render(body: &str) -> String {
        format!("{}\n{}", SCRIPT_PREAMBLE, body)
    }

    /// Writes `script.sh` into `staging` and runs it, returning its output.
    pub async fn run(&self, staging: &Path, body: &str) -> Result<String> {
        let script = staging.join(SCRIPT_FILE);
        tokio::fs::write(&script, Self::render(body))
            .await
            .map_err(|e| ReconcileError::filesystem(ReconcileStage::Execute, &script, e))?;

        let mut cmd = Command::new(&self.shell);
        cmd.arg(SCRIPT_FILE).current_dir(staging);

        let output = run_captured(cmd, self.timeout)
            .await
            .map_err(|e| ReconcileError::Execution {
                exit_code: None,
                output: e.to_string(),
            })?;

        let text = joined(&output);
        if !output.success() {
            return Err(ReconcileError::Execution {
                exit_code: output.exit_code(),
                output: text,
            });
        }

        self.reporter.report(ActivityEvent::ScriptCompleted {
            output: text.clone(),
        });
        Ok(text)
    }
}

// The preamble already merges stderr; anything left there came from the shell itself.
fn joined(output: &CapturedOutput) -> String {
    if output.stderr.is_empty() {
        output.stdout.clone()
    } else {
        format!("{}{}", output.stdout, output.stderr)
    }
}
