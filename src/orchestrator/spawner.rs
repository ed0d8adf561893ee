//! Child process spawning and signalling.
//!
//! Target games are spawned with `kill_on_drop(true)`, stdin detached, and
//! (on Unix) in their own process group so a termination request reaches
//! anything the game itself starts. Detached supervisors for the launch
//! bridge are spawned without `kill_on_drop` so they outlive the request.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Stdio;

use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use super::artifact::SessionManifest;
use crate::{AppError, Result};

/// Environment variable carrying the session identifier into the child.
pub const SESSION_ID_ENV: &str = "ARCADE_SESSION_ID";

/// Spawn the game described by `manifest` in its own working directory.
///
/// # Errors
///
/// Returns `AppError::Spawn` if the OS refuses to start the program
/// (missing, not executable, permission denied).
pub fn spawn_target(manifest: &SessionManifest) -> Result<Child> {
    let descriptor = &manifest.descriptor;
    let mut cmd = Command::new(&manifest.command.program);
    cmd.args(&manifest.command.args)
        .env(SESSION_ID_ENV, &manifest.session_id)
        .current_dir(&descriptor.working_directory)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .kill_on_drop(true);

    #[cfg(unix)]
    cmd.process_group(0);

    let child = cmd.spawn().map_err(|err| {
        AppError::Spawn(format!(
            "failed to start {}: {err}",
            manifest.command.program.display()
        ))
    })?;

    info!(
        session_id = %manifest.session_id,
        game = %descriptor.display_name,
        pid = child.id().unwrap_or(0),
        "game process spawned"
    );
    Ok(child)
}

/// Ask the child to exit. Returns `false` if no request could be sent
/// (the child is already reaped or signalling failed).
pub fn request_termination(child: &mut Child) -> bool {
    let Some(pid) = child.id() else {
        return false;
    };

    #[cfg(unix)]
    {
        signal_group(pid, nix::sys::signal::Signal::SIGTERM)
    }

    #[cfg(not(unix))]
    {
        debug!(pid, "no polite termination on this platform; killing");
        child.start_kill().is_ok()
    }
}

/// Kill the child (and on Unix its whole process group) immediately.
pub fn force_kill(child: &mut Child) {
    let Some(pid) = child.id() else {
        return;
    };

    #[cfg(unix)]
    signal_group(pid, nix::sys::signal::Signal::SIGKILL);

    if let Err(err) = child.start_kill() {
        debug!(pid, %err, "start_kill failed; process likely already exited");
    }
}

#[cfg(unix)]
fn signal_group(pid: u32, signal: nix::sys::signal::Signal) -> bool {
    use nix::errno::Errno;
    use nix::sys::signal::killpg;
    use nix::unistd::Pid;

    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };

    match killpg(Pid::from_raw(raw), signal) {
        Ok(()) => {
            debug!(pid, ?signal, "signalled process group");
            true
        }
        Err(Errno::ESRCH) => false,
        Err(err) => {
            warn!(pid, ?signal, %err, "failed to signal process group");
            false
        }
    }
}

/// Starts a supervisor for a manifest without waiting on it.
pub trait SessionSpawner: Send + Sync {
    /// Spawn a detached supervisor that takes ownership of `manifest`.
    /// Returns the new process id.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` if the process cannot be started.
    fn spawn_detached(&self, manifest: &Path) -> Result<u32>;
}

/// Re-executes a launcher binary in `supervise` mode.
///
/// By default the supervisor gets its own process group and a headless
/// control surface. With [`attach_terminal`](Self::attach_terminal) it
/// stays in the bridge's process group and takes its hotkeys from the
/// controlling terminal, so a bridge run from the arcade console gives
/// every session the same hotkeys as a direct launch.
#[derive(Debug, Clone)]
pub struct SupervisorSpawner {
    program: PathBuf,
    leading_args: Vec<OsString>,
    artifact_dir: Option<PathBuf>,
    attach_terminal: bool,
}

impl SupervisorSpawner {
    /// Spawner that runs `program [leading_args..] supervise --manifest <path>`.
    #[must_use]
    pub fn new(program: impl Into<PathBuf>, leading_args: Vec<OsString>) -> Self {
        Self {
            program: program.into(),
            leading_args,
            artifact_dir: None,
            attach_terminal: false,
        }
    }

    /// Spawner for the currently running executable.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Spawn` if the current executable path is unknown.
    pub fn current_exe(leading_args: Vec<OsString>) -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|err| AppError::Spawn(format!("cannot locate launcher binary: {err}")))?;
        Ok(Self::new(program, leading_args))
    }

    /// Tell supervisors which directory their manifests live in.
    #[must_use]
    pub fn with_artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = Some(dir.into());
        self
    }

    /// Share the caller's terminal with spawned supervisors.
    #[must_use]
    pub fn attach_terminal(mut self, attach: bool) -> Self {
        self.attach_terminal = attach;
        self
    }
}

impl SessionSpawner for SupervisorSpawner {
    fn spawn_detached(&self, manifest: &Path) -> Result<u32> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.leading_args)
            .arg("supervise")
            .arg("--manifest")
            .arg(manifest);
        if let Some(dir) = &self.artifact_dir {
            cmd.arg("--artifact-dir").arg(dir);
        }
        if self.attach_terminal {
            cmd.arg("--attach-terminal");
        }
        cmd.stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::inherit());

        #[cfg(unix)]
        if !self.attach_terminal {
            cmd.process_group(0);
        }

        // Dropping the handle leaves the process running; tokio reaps it
        // in the background once it exits.
        let child = cmd.spawn().map_err(|err| {
            AppError::Spawn(format!(
                "failed to start supervisor {}: {err}",
                self.program.display()
            ))
        })?;

        let pid = child.id().unwrap_or(0);
        info!(
            pid,
            manifest = %manifest.display(),
            attach_terminal = self.attach_terminal,
            "detached supervisor spawned"
        );
        Ok(pid)
    }
}
