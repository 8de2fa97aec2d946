//! Captured subprocess execution shared by checkout, decryption and the
//! deployment script.

use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::process::Command;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("Failed to launch '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("'{program}' timed out after {secs}s")]
    TimedOut { program: String, secs: u64 },
}

/// Output of a finished subprocess.
#[derive(Debug)]
pub struct CapturedOutput {
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

impl CapturedOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn exit_code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Stderr and stdout joined for diagnostics.
    ///
    /// Falls back to the exit code when the process printed nothing.
    pub fn combined(&self) -> String {
        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();

        match (stderr.is_empty(), stdout.is_empty()) {
            (true, true) => format!(
                "Command failed with exit code {}",
                self.status.code().unwrap_or(-1)
            ),
            (true, false) => stdout.to_string(),
            (false, true) => stderr.to_string(),
            (false, false) => format!("{}\n{}", stderr, stdout),
        }
    }
}

/// Runs `cmd` to completion, capturing stdout and stderr.
///
/// With a `timeout`, the child is killed once the deadline passes.
pub async fn run_captured(
    mut cmd: Command,
    timeout: Option<Duration>,
) -> Result<CapturedOutput, ProcessError> {
    let program = cmd.as_std().get_program().to_string_lossy().into_owned();

    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let start = Instant::now();
    log::debug!("Running {}", program);

    let output = match timeout {
        Some(limit) => match tokio::time::timeout(limit, cmd.output()).await {
            Ok(result) => result,
            Err(_) => {
                return Err(ProcessError::TimedOut {
                    program,
                    secs: limit.as_secs(),
                })
            }
        },
        None => cmd.output().await,
    }
    .map_err(|source| ProcessError::Spawn {
        program: program.clone(),
        source,
    })?;

    let duration = start.elapsed();
    log::debug!(
        "{} exited with {:?} after {}ms",
        program,
        output.status.code(),
        duration.as_millis()
    );

    Ok(CapturedOutput {
        status: output.status,
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        duration,
    })
}
