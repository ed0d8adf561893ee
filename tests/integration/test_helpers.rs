//! Shared fixtures for supervisor and bridge integration tests.
//!
//! Games are tiny shell scripts run with `sh`, so every scenario controls
//! exactly how its child behaves (exits, crashes, ignores SIGTERM).

use std::cell::RefCell;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use tempfile::TempDir;

use arcade_launcher::catalog::GameCatalog;
use arcade_launcher::config::LauncherConfig;
use arcade_launcher::control::ControlSurface;

/// Script that runs until signalled.
pub const LONG_RUNNING: &str = "exec sleep 30\n";

/// Script that ignores SIGTERM and must be force-killed.
pub const IGNORES_TERM: &str = "trap '' TERM\nsleep 30\n";

/// A games root plus a private artifact directory.
pub struct GamesFixture {
    _games: TempDir,
    artifacts: TempDir,
    pub config: LauncherConfig,
}

impl GamesFixture {
    /// Create one game directory per `(name, run.sh body)` pair.
    pub fn new(games: &[(&str, &str)]) -> Self {
        let root = tempfile::tempdir().expect("games root");
        for (name, script) in games {
            let dir = root.path().join(name);
            fs::create_dir_all(&dir).expect("game dir");
            fs::write(dir.join("run.sh"), script).expect("run.sh");
        }
        let artifacts = tempfile::tempdir().expect("artifact dir");

        let mut config = LauncherConfig::default_for(root.path()).expect("config");
        config.interpreter = "sh".into();
        config.entry_points = vec!["run.sh".into()];
        config.artifact_dir = Some(artifacts.path().to_path_buf());
        config.http_port = 0;
        config.control.tick_rate_hz = 100;
        config.control.help_seconds = 1;
        config.control.grace_ticks = 20;

        Self {
            _games: root,
            artifacts,
            config,
        }
    }

    pub fn catalog(&self) -> GameCatalog {
        GameCatalog::from_config(&self.config)
    }

    pub fn artifact_dir(&self) -> &Path {
        self.artifacts.path()
    }

    /// Manifests currently on disk.
    pub fn manifests(&self) -> Vec<PathBuf> {
        fs::read_dir(self.artifacts.path())
            .expect("read artifact dir")
            .map(|entry| entry.expect("entry").path())
            .collect()
    }
}

/// What a [`ScriptedSurface`] saw during a session.
#[derive(Debug, Default)]
pub struct SurfaceLog {
    pub drains: u32,
    pub overlays: Vec<Option<String>>,
}

/// Control surface that presses keys on scheduled ticks.
///
/// Tick `n` is the `n`th call to `drain_keys`, counted from zero.
pub struct ScriptedSurface {
    presses: HashMap<u32, Vec<KeyEvent>>,
    log: Rc<RefCell<SurfaceLog>>,
}

impl ScriptedSurface {
    pub fn new() -> (Self, Rc<RefCell<SurfaceLog>>) {
        let log = Rc::new(RefCell::new(SurfaceLog::default()));
        let surface = Self {
            presses: HashMap::new(),
            log: Rc::clone(&log),
        };
        (surface, log)
    }

    /// Press `code` on `tick`.
    pub fn press_at(mut self, tick: u32, code: KeyCode) -> Self {
        self.presses
            .entry(tick)
            .or_default()
            .push(KeyEvent::new(code, KeyModifiers::NONE));
        self
    }
}

impl ControlSurface for ScriptedSurface {
    fn drain_keys(&mut self) -> io::Result<Vec<KeyEvent>> {
        let mut log = self.log.borrow_mut();
        let tick = log.drains;
        log.drains += 1;
        Ok(self.presses.remove(&tick).unwrap_or_default())
    }

    fn render_overlay(&mut self, overlay: Option<&str>) -> io::Result<()> {
        self.log.borrow_mut().overlays.push(overlay.map(str::to_owned));
        Ok(())
    }
}

/// Whether `pid` still names a live (or unreaped) process.
#[cfg(unix)]
pub fn process_exists(pid: u32) -> bool {
    use nix::sys::signal::kill;
    use nix::unistd::Pid;

    let raw = i32::try_from(pid).expect("pid fits");
    kill(Pid::from_raw(raw), None).is_ok()
}
