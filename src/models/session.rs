//! Session model and lifecycle helpers.

use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::process::ExitStatus;

use serde::{Deserialize, Serialize};

/// Resolved launch target for one game.
///
/// Immutable once produced by the resolver; the supervisor owns it for the
/// lifetime of the session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionDescriptor {
    /// Normalized identifier (lowercase, spaces replaced by `-`).
    pub id: String,
    /// Directory name as it appears on disk.
    pub display_name: String,
    /// Absolute path of the entry point inside the game directory.
    pub executable_path: PathBuf,
    /// Game directory; the child process starts here.
    pub working_directory: PathBuf,
}

/// Program and arguments used to start a session's child process.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct TargetCommand {
    /// Interpreter, or the entry point itself when no interpreter is set.
    pub program: PathBuf,
    /// Arguments; ends with the entry point when an interpreter is used.
    pub args: Vec<PathBuf>,
}

/// Supervisor state machine positions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Manifest loaded, child being spawned.
    Launching,
    /// Fixed-rate loop polling input and child liveness.
    Monitoring,
    /// Operator asked to stop; grace window then forced kill.
    TerminatingOperator,
    /// Child exited on its own.
    TerminatingChild,
    /// Cleanup coordinator running.
    CleaningUp,
    /// Terminal.
    Done,
}

impl SessionState {
    /// Determine whether a lifecycle transition is permitted.
    #[must_use]
    pub fn can_transition_to(self, next: SessionState) -> bool {
        matches!(
            (self, next),
            (
                SessionState::Launching,
                SessionState::Monitoring | SessionState::CleaningUp
            ) | (
                SessionState::Monitoring,
                SessionState::TerminatingOperator
                    | SessionState::TerminatingChild
                    | SessionState::CleaningUp
            ) | (
                SessionState::TerminatingOperator | SessionState::TerminatingChild,
                SessionState::CleaningUp
            ) | (SessionState::CleaningUp, SessionState::Done)
        )
    }
}

/// Terminal state reported by the supervisor to its caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum SessionOutcome {
    /// Child exited with a success status.
    ExitedNormally,
    /// Child exited with a non-zero status or was killed by a signal.
    ExitedCrashed {
        /// Exit code when the platform reported one.
        code: Option<i32>,
    },
    /// Operator pressed the terminate key (or the supervisor was signalled).
    ExitedByOperator,
    /// The child process could not be started.
    SpawnFailed {
        /// OS error text.
        reason: String,
    },
    /// The session manifest could not be written or read.
    GenerationFailed {
        /// Underlying failure text.
        reason: String,
    },
}

impl SessionOutcome {
    /// Classify a child exit status.
    #[must_use]
    pub fn from_exit_status(status: ExitStatus) -> Self {
        if status.success() {
            Self::ExitedNormally
        } else {
            Self::ExitedCrashed {
                code: status.code(),
            }
        }
    }

    /// Whether the outcome means the session never got a running child.
    #[must_use]
    pub fn is_launch_failure(&self) -> bool {
        matches!(
            self,
            Self::SpawnFailed { .. } | Self::GenerationFailed { .. }
        )
    }
}

impl Display for SessionOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExitedNormally => write!(f, "exited normally"),
            Self::ExitedCrashed { code: Some(code) } => write!(f, "crashed with code {code}"),
            Self::ExitedCrashed { code: None } => write!(f, "terminated by signal"),
            Self::ExitedByOperator => write!(f, "stopped by operator"),
            Self::SpawnFailed { reason } => write!(f, "spawn failed: {reason}"),
            Self::GenerationFailed { reason } => write!(f, "generation failed: {reason}"),
        }
    }
}
