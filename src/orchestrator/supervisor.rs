//! Process supervisor: the per-session state machine.
//!
//! `Launching → Monitoring → {TerminatingOperator, TerminatingChild} →
//! CleaningUp → Done`. A launch failure goes straight to `CleaningUp`.
//!
//! Monitoring is a single fixed-rate loop. Each tick drains operator input,
//! then checks child liveness with a non-blocking `try_wait`, then advances
//! the help overlay. A terminate request seen in a tick wins over a child
//! exit observed in the same tick. The only waits are the bounded grace
//! window and the bounded reap after a forced kill.

use std::process::ExitStatus;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::process::Child;
use tokio::time::{interval, timeout, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, info_span, warn, Instrument};

use super::artifact::{generate, SessionManifest, WrapperArtifact};
use super::cleanup::{CleanupCoordinator, CleanupReport, WorkingDirScope};
use super::spawner::{force_kill, request_termination, spawn_target};
use crate::catalog::GameCatalog;
use crate::config::LauncherConfig;
use crate::control::{ControlChannel, ControlSurface, Hotkeys};
use crate::models::control::ControlSignal;
use crate::models::session::{SessionOutcome, SessionState};
use crate::{AppError, Result};

/// Upper bound on reaping a child after a forced kill.
pub const KILL_REAP_TIMEOUT: Duration = Duration::from_secs(2);

/// What the supervisor reports once a session reaches `Done`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct SessionReport {
    /// Session identifier, when the manifest could be read.
    pub session_id: Option<String>,
    /// Normalized game identifier, when known.
    pub game_id: Option<String>,
    /// Terminal state.
    pub outcome: SessionOutcome,
    /// Child process id, when a child was started.
    pub pid: Option<u32>,
    /// When `Launching` began.
    pub started_at: DateTime<Utc>,
    /// When `Done` was reached.
    pub ended_at: DateTime<Utc>,
    /// Per-step cleanup results.
    pub cleanup: CleanupReport,
}

/// Title used for the control surface of a session.
#[must_use]
pub fn surface_title(manifest: &SessionManifest) -> String {
    format!(
        "{} - Press {} to return to launcher",
        manifest.descriptor.display_name, manifest.control.terminate_key
    )
}

/// Why the monitoring loop stopped.
enum MonitorExit {
    Operator,
    ChildExited(ExitStatus),
    PollFailed(String),
}

/// One live launch and the resources it owns.
struct ProcessSession {
    manifest: Option<SessionManifest>,
    state: SessionState,
    started_at: DateTime<Utc>,
    pid: Option<u32>,
    cleanup: CleanupCoordinator,
}

impl ProcessSession {
    fn new(artifact: Option<WrapperArtifact>) -> Self {
        let working_dir = match WorkingDirScope::capture() {
            Ok(scope) => Some(scope),
            Err(err) => {
                warn!(%err, "working directory not captured; it will not be restored");
                None
            }
        };
        Self {
            manifest: None,
            state: SessionState::Launching,
            started_at: Utc::now(),
            pid: None,
            cleanup: CleanupCoordinator::new(artifact, working_dir),
        }
    }

    fn advance(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "invalid transition {:?} -> {next:?}",
            self.state
        );
        debug!(from = ?self.state, to = ?next, "session state");
        self.state = next;
    }

    /// Run cleanup and produce the terminal report.
    fn finish(mut self, outcome: SessionOutcome) -> SessionReport {
        self.advance(SessionState::CleaningUp);
        let cleanup = self.cleanup.run().clone();
        self.advance(SessionState::Done);

        let report = SessionReport {
            session_id: self.manifest.as_ref().map(|m| m.session_id.clone()),
            game_id: self.manifest.as_ref().map(|m| m.descriptor.id.clone()),
            outcome,
            pid: self.pid,
            started_at: self.started_at,
            ended_at: Utc::now(),
            cleanup,
        };

        info!(
            session_id = report.session_id.as_deref().unwrap_or("-"),
            game = report.game_id.as_deref().unwrap_or("-"),
            outcome = %report.outcome,
            cleanup_clean = report.cleanup.is_clean(),
            "session done"
        );
        report
    }
}

/// Resolve `identifier`, write its manifest, and supervise it in this
/// process until `Done`.
///
/// # Errors
///
/// Returns `AppError::NotFound` if the identifier does not resolve. Every
/// other failure is reported through [`SessionReport::outcome`].
pub async fn launch<S, F>(
    config: &LauncherConfig,
    catalog: &GameCatalog,
    identifier: &str,
    make_surface: F,
    shutdown: CancellationToken,
) -> Result<SessionReport>
where
    S: ControlSurface,
    F: FnOnce(&SessionManifest) -> S,
{
    let descriptor = catalog.resolve(identifier)?;
    let command = catalog.command_for(&descriptor);
    let manifest = SessionManifest::new(descriptor, command, config.control.clone());

    match generate(&config.artifact_dir(), &manifest) {
        Ok(artifact) => Ok(supervise(artifact, make_surface, shutdown).await),
        Err(err) => {
            warn!(%err, game = %manifest.descriptor.id, "session manifest not generated");
            let mut session = ProcessSession::new(None);
            session.manifest = Some(manifest);
            Ok(session.finish(SessionOutcome::GenerationFailed {
                reason: err.to_string(),
            }))
        }
    }
}

/// Supervise the session described by `artifact`, taking ownership of the
/// manifest file. Always returns a terminal report; an ephemeral manifest
/// is gone afterwards on every path. A non-ephemeral one is neither run
/// nor removed.
pub async fn supervise<S, F>(
    artifact: WrapperArtifact,
    make_surface: F,
    shutdown: CancellationToken,
) -> SessionReport
where
    S: ControlSurface,
    F: FnOnce(&SessionManifest) -> S,
{
    let span = info_span!("supervise", manifest = %artifact.path().display());
    run_session(artifact, make_surface, shutdown)
        .instrument(span)
        .await
}

async fn run_session<S, F>(
    artifact: WrapperArtifact,
    make_surface: F,
    shutdown: CancellationToken,
) -> SessionReport
where
    S: ControlSurface,
    F: FnOnce(&SessionManifest) -> S,
{
    let manifest = if artifact.is_ephemeral() {
        artifact.load()
    } else {
        Err(AppError::Generation(format!(
            "{} is not a session manifest in the artifact directory",
            artifact.path().display()
        )))
    };
    let mut session = ProcessSession::new(Some(artifact));

    let manifest = match manifest {
        Ok(manifest) => manifest,
        Err(err) => {
            warn!(%err, "cannot load session manifest");
            return session.finish(SessionOutcome::GenerationFailed {
                reason: err.to_string(),
            });
        }
    };

    let hotkeys = match Hotkeys::from_settings(&manifest.control) {
        Ok(hotkeys) => hotkeys,
        Err(err) => {
            session.manifest = Some(manifest);
            return session.finish(SessionOutcome::GenerationFailed {
                reason: err.to_string(),
            });
        }
    };

    let child = match spawn_target(&manifest) {
        Ok(child) => child,
        Err(err) => {
            warn!(%err, game = %manifest.descriptor.id, "game failed to start");
            session.manifest = Some(manifest);
            return session.finish(SessionOutcome::SpawnFailed {
                reason: err.to_string(),
            });
        }
    };
    session.pid = child.id();
    session.cleanup.track_child(child);
    session.advance(SessionState::Monitoring);

    let mut ticker = interval(manifest.control.tick_interval());
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let grace_ticks = manifest.control.grace_ticks;
    let mut channel = ControlChannel::new(
        make_surface(&manifest),
        hotkeys,
        manifest.control.help_ticks(),
    );
    info!(
        session_id = %manifest.session_id,
        game = %manifest.descriptor.display_name,
        hint = channel.help_text(),
        "monitoring session"
    );
    session.manifest = Some(manifest);

    let Some(child) = session.cleanup.child_mut() else {
        return session.finish(SessionOutcome::ExitedCrashed { code: None });
    };
    let exit = monitor(child, &mut channel, &mut ticker, &shutdown).await;

    let outcome = match exit {
        MonitorExit::Operator => {
            session.advance(SessionState::TerminatingOperator);
            if let Some(child) = session.cleanup.child_mut() {
                terminate_with_grace(child, grace_ticks, &mut ticker).await;
            }
            SessionOutcome::ExitedByOperator
        }
        MonitorExit::ChildExited(status) => {
            session.advance(SessionState::TerminatingChild);
            SessionOutcome::from_exit_status(status)
        }
        MonitorExit::PollFailed(reason) => {
            warn!(reason = %reason, "lost track of game process");
            session.advance(SessionState::TerminatingChild);
            SessionOutcome::ExitedCrashed { code: None }
        }
    };

    // Restore the terminal before cleanup output.
    drop(channel);
    session.finish(outcome)
}

async fn monitor<S: ControlSurface>(
    child: &mut Child,
    channel: &mut ControlChannel<S>,
    ticker: &mut Interval,
    shutdown: &CancellationToken,
) -> MonitorExit {
    loop {
        ticker.tick().await;

        let mut terminate = shutdown.is_cancelled();
        for signal in channel.poll_signals() {
            match signal {
                ControlSignal::Terminate => terminate = true,
                ControlSignal::ShowHelp => channel.show_help(),
            }
        }
        if terminate {
            info!("operator requested return to launcher");
            return MonitorExit::Operator;
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                info!(%status, "game process exited");
                return MonitorExit::ChildExited(status);
            }
            Ok(None) => {}
            Err(err) => return MonitorExit::PollFailed(err.to_string()),
        }

        channel.render_tick();
    }
}

/// Ask the child to stop, wait up to `grace_ticks`, then force-kill.
async fn terminate_with_grace(child: &mut Child, grace_ticks: u32, ticker: &mut Interval) {
    if request_termination(child) {
        for _ in 0..grace_ticks {
            ticker.tick().await;
            if let Ok(Some(status)) = child.try_wait() {
                info!(%status, "game exited within grace window");
                return;
            }
        }
        warn!(grace_ticks, "grace window elapsed; forcing kill");
    }

    force_kill(child);
    match timeout(KILL_REAP_TIMEOUT, child.wait()).await {
        Ok(Ok(status)) => info!(%status, "game process killed"),
        Ok(Err(err)) => warn!(%err, "error reaping killed game process"),
        Err(_) => warn!("killed game process not reaped in time; cleanup will retry"),
    }
}
