//! Cleanup coordinator: the single finalizer for a session.
//!
//! Runs an ordered list of independent steps (kill child, remove manifest,
//! restore working directory). Each step is attempted even if an earlier
//! one failed, and every result is kept in a [`CleanupReport`]. The
//! coordinator runs at most once; if the supervisor never calls [`run`]
//! (panic, aborted future) it runs from `Drop`.
//!
//! [`run`]: CleanupCoordinator::run

use std::env;
use std::io;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use serde::Serialize;
use tokio::process::Child;
use tracing::{debug, warn};

use super::artifact::WrapperArtifact;
use super::spawner::force_kill;
use crate::{AppError, Result};

/// Attempts made to observe the child gone after a forced kill.
const KILL_CONFIRM_ATTEMPTS: u32 = 10;

/// Pause between kill confirmation attempts.
///
/// Confirmation sleeps on the calling thread because cleanup also runs
/// from `Drop`. The supervisor reaps the child before cleanup on every
/// normal path, so the wait (at most 50 ms) only happens after a failure.
const KILL_CONFIRM_PAUSE: Duration = Duration::from_millis(5);

/// One cleanup responsibility.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CleanupAction {
    /// Confirm the child is gone, force-killing it if needed.
    KillChild,
    /// Delete the session manifest.
    RemoveArtifact,
    /// Put the process working directory back.
    RestoreWorkingDir,
}

/// Result of one cleanup step.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "status", content = "detail")]
pub enum StepResult {
    /// The step changed something.
    Done,
    /// Nothing to do.
    Skipped,
    /// The step failed; the message is logged and kept.
    Failed(String),
}

/// One attempted action and its result.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct CleanupStep {
    /// What was attempted.
    pub action: CleanupAction,
    /// How it went.
    pub result: StepResult,
}

/// Ordered results of a cleanup run.
#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
pub struct CleanupReport {
    steps: Vec<CleanupStep>,
}

impl CleanupReport {
    /// All steps in execution order.
    #[must_use]
    pub fn steps(&self) -> &[CleanupStep] {
        &self.steps
    }

    /// Result recorded for `action`, if it ran.
    #[must_use]
    pub fn result_of(&self, action: CleanupAction) -> Option<&StepResult> {
        self.steps
            .iter()
            .find(|step| step.action == action)
            .map(|step| &step.result)
    }

    /// Steps that failed (a partial cleanup failure when non-empty).
    pub fn failures(&self) -> impl Iterator<Item = &CleanupStep> {
        self.steps
            .iter()
            .filter(|step| matches!(step.result, StepResult::Failed(_)))
    }

    /// Whether every step succeeded or had nothing to do.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }

    fn push(&mut self, action: CleanupAction, result: StepResult) {
        if let StepResult::Failed(ref reason) = result {
            warn!(?action, reason = %reason, "cleanup step failed");
        }
        self.steps.push(CleanupStep { action, result });
    }
}

/// Working directory captured when a session starts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirScope {
    previous: PathBuf,
}

impl WorkingDirScope {
    /// Record the current working directory.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the working directory cannot be read.
    pub fn capture() -> Result<Self> {
        let previous = env::current_dir()
            .map_err(|err| AppError::Io(format!("cannot read working directory: {err}")))?;
        Ok(Self { previous })
    }

    /// The captured directory.
    #[must_use]
    pub fn previous(&self) -> &Path {
        &self.previous
    }

    /// Change back to the captured directory if anything moved away from it.
    /// Returns `Ok(true)` when a change was needed.
    ///
    /// # Errors
    ///
    /// Returns the I/O error from `set_current_dir`.
    pub fn restore(&self) -> io::Result<bool> {
        if env::current_dir().is_ok_and(|current| current == self.previous) {
            return Ok(false);
        }
        env::set_current_dir(&self.previous)?;
        Ok(true)
    }
}

/// Owns every resource a session must release.
#[derive(Debug, Default)]
pub struct CleanupCoordinator {
    child: Option<Child>,
    artifact: Option<WrapperArtifact>,
    working_dir: Option<WorkingDirScope>,
    report: Option<CleanupReport>,
}

impl CleanupCoordinator {
    /// Coordinator for a session that may already own a manifest and a
    /// captured working directory.
    #[must_use]
    pub fn new(artifact: Option<WrapperArtifact>, working_dir: Option<WorkingDirScope>) -> Self {
        Self {
            child: None,
            artifact,
            working_dir,
            report: None,
        }
    }

    /// Hand the live child to the coordinator.
    pub fn track_child(&mut self, child: Child) {
        self.child = Some(child);
    }

    /// Borrow the tracked child, if any.
    pub fn child_mut(&mut self) -> Option<&mut Child> {
        self.child.as_mut()
    }

    /// Whether [`run`](Self::run) has completed.
    #[must_use]
    pub fn has_run(&self) -> bool {
        self.report.is_some()
    }

    /// Run every cleanup step once and return the report. Later calls
    /// return the first report without repeating any step.
    pub fn run(&mut self) -> &CleanupReport {
        if self.report.is_none() {
            let mut report = CleanupReport::default();
            report.push(CleanupAction::KillChild, self.kill_child());
            report.push(CleanupAction::RemoveArtifact, self.remove_artifact());
            report.push(CleanupAction::RestoreWorkingDir, self.restore_working_dir());
            debug!(clean = report.is_clean(), "session cleanup finished");
            self.report = Some(report);
        }
        self.report.get_or_insert_with(CleanupReport::default)
    }

    fn kill_child(&mut self) -> StepResult {
        let Some(mut child) = self.child.take() else {
            return StepResult::Skipped;
        };

        match child.try_wait() {
            Ok(Some(_)) => return StepResult::Skipped,
            Ok(None) => {}
            Err(err) => debug!(%err, "child status unknown; killing anyway"),
        }

        force_kill(&mut child);
        for _ in 0..KILL_CONFIRM_ATTEMPTS {
            if let Ok(Some(_)) = child.try_wait() {
                return StepResult::Done;
            }
            thread::sleep(KILL_CONFIRM_PAUSE);
        }

        // Dropping the handle re-sends the kill (`kill_on_drop`).
        StepResult::Failed("child did not confirm exit after forced kill".into())
    }

    fn remove_artifact(&mut self) -> StepResult {
        let Some(artifact) = self.artifact.take() else {
            return StepResult::Skipped;
        };
        if !artifact.is_ephemeral() {
            return StepResult::Skipped;
        }

        match artifact.remove() {
            Ok(true) => StepResult::Done,
            Ok(false) => StepResult::Skipped,
            Err(err) => StepResult::Failed(format!(
                "cannot remove {}: {err}",
                artifact.path().display()
            )),
        }
    }

    fn restore_working_dir(&mut self) -> StepResult {
        let Some(scope) = self.working_dir.take() else {
            return StepResult::Skipped;
        };

        match scope.restore() {
            Ok(true) => StepResult::Done,
            Ok(false) => StepResult::Skipped,
            Err(err) => StepResult::Failed(format!(
                "cannot restore {}: {err}",
                scope.previous().display()
            )),
        }
    }
}

impl Drop for CleanupCoordinator {
    fn drop(&mut self) {
        if !self.has_run() {
            warn!("session ended without explicit cleanup; finalizing on drop");
            self.run();
        }
    }
}
