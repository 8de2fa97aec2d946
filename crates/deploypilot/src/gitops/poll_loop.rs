//! Poll loop: detects new revisions and hands them to a [`RevisionHandler`].
//!
//! The loop remembers the last revision it saw. The first query only sets
//! that baseline; afterwards every tick compares the remote revision with it
//! and fires the handler exactly once per change. State is updated before
//! the handler runs, so a failed deployment is not retried until the next
//! commit.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard, Notify};
use tokio::time::MissedTickBehavior;

use super::error::ReconcileError;
use super::progress::{ActivityEvent, ActivityReporter};
use crate::error::StartupError;
use crate::github::{RevisionError, RevisionRecord, RevisionSource};

/// Reacts to a newly detected revision.
#[async_trait::async_trait]
pub trait RevisionHandler: Send + Sync {
    async fn handle(&self, revision: &RevisionRecord) -> Result<(), ReconcileError>;
}

/// What the loop knows about the remote.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorState {
    pub last_known_revision: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Initializing,
    Running,
    Stopped,
}

/// Result of a single poll.
#[derive(Debug)]
pub enum TickOutcome {
    /// Remote revision equals the last known one.
    Unchanged,
    /// The revision query failed; state untouched.
    QueryFailed(RevisionError),
    /// A new revision was handed to the handler.
    Handled {
        revision: RevisionRecord,
        result: Result<(), ReconcileError>,
    },
    /// Baseline not established, or the loop was stopped.
    NotRunning,
}

/// Held for the whole duration of a handler call; at most one exists.
#[derive(Debug, Clone, Default)]
pub struct ReconcileToken {
    lock: Arc<Mutex<()>>,
}

impl ReconcileToken {
    pub async fn acquire(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().await
    }

    /// Whether a reconciliation is in flight right now.
    pub fn is_held(&self) -> bool {
        self.lock.try_lock().is_err()
    }
}

/// Stops a running loop between ticks.
#[derive(Debug, Clone, Default)]
pub struct ShutdownHandle {
    stopped: Arc<AtomicBool>,
    notify: Arc<Notify>,
}

impl ShutdownHandle {
    /// Signals the loop to stop. Safe to call from any thread.
    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Release);
        self.notify.notify_one();
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped.load(Ordering::Acquire)
    }

    async fn wait(&self) {
        self.notify.notified().await;
    }
}

pub struct PollLoop {
    source: Arc<dyn RevisionSource>,
    handler: Arc<dyn RevisionHandler>,
    path_scope: String,
    interval: Duration,
    reporter: Arc<dyn ActivityReporter>,
    state: MonitorState,
    phase: LoopPhase,
    token: ReconcileToken,
    shutdown: ShutdownHandle,
}

impl PollLoop {
    pub fn new(
        source: Arc<dyn RevisionSource>,
        handler: Arc<dyn RevisionHandler>,
        path_scope: impl Into<String>,
        interval: Duration,
        reporter: Arc<dyn ActivityReporter>,
    ) -> Self {
        Self {
            source,
            handler,
            path_scope: path_scope.into(),
            interval,
            reporter,
            state: MonitorState::default(),
            phase: LoopPhase::Initializing,
            token: ReconcileToken::default(),
            shutdown: ShutdownHandle::default(),
        }
    }

    pub fn state(&self) -> &MonitorState {
        &self.state
    }

    pub fn phase(&self) -> LoopPhase {
        self.phase
    }

    pub fn token(&self) -> ReconcileToken {
        self.token.clone()
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        self.shutdown.clone()
    }

    /// Records the current remote revision without reconciling it.
    pub async fn establish_baseline(&mut self) -> Result<RevisionRecord, StartupError> {
        match self.source.fetch_latest(&self.path_scope).await {
            Ok(revision) => {
                self.state.last_known_revision = Some(revision.id.clone());
                self.phase = LoopPhase::Running;
                self.reporter.report(ActivityEvent::BaselineEstablished {
                    revision: revision.id.clone(),
                    path_scope: self.path_scope.clone(),
                });
                Ok(revision)
            }
            Err(e) => {
                self.phase = LoopPhase::Stopped;
                Err(StartupError::Baseline(e))
            }
        }
    }

    /// Polls once and fires the handler if the revision changed.
    pub async fn tick(&mut self) -> TickOutcome {
        if self.phase != LoopPhase::Running {
            return TickOutcome::NotRunning;
        }

        let revision = match self.source.fetch_latest(&self.path_scope).await {
            Ok(revision) => revision,
            Err(e) => {
                self.reporter.report(ActivityEvent::PollFailed {
                    error: e.to_string(),
                });
                return TickOutcome::QueryFailed(e);
            }
        };

        if self.state.last_known_revision.as_deref() == Some(revision.id.as_str()) {
            log::debug!("No new commits (still at {})", revision.short_id());
            return TickOutcome::Unchanged;
        }

        self.state.last_known_revision = Some(revision.id.clone());
        self.reporter.report(ActivityEvent::RevisionDetected {
            revision: revision.id.clone(),
            author: revision.author_name.clone(),
            message: revision.summary().to_string(),
        });

        let result = {
            let _guard = self.token.acquire().await;
            self.handler.handle(&revision).await
        };

        TickOutcome::Handled { revision, result }
    }

    /// Establishes the baseline, then polls every interval until stopped.
    pub async fn run(&mut self) -> Result<(), StartupError> {
        self.establish_baseline().await?;

        let shutdown = self.shutdown.clone();
        let mut timer = tokio::time::interval(self.interval);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        timer.tick().await; // skip immediate first tick

        loop {
            if shutdown.is_stopped() {
                break;
            }

            tokio::select! {
                _ = timer.tick() => {},
                _ = shutdown.wait() => {},
            }

            if shutdown.is_stopped() {
                break;
            }

            self.tick().await;
        }

        log::info!("Monitoring stopped");
        self.phase = LoopPhase::Stopped;
        Ok(())
    }
}
