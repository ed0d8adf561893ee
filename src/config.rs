//! Launcher configuration parsing and validation.

use std::fs;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::control::hotkey::parse_key;
use crate::{AppError, Result};

/// Control surface and polling loop settings.
///
/// Embedded verbatim in every session manifest so a detached supervisor
/// runs with the same timing as the process that generated it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ControlSettings {
    /// Supervisor loop rate in ticks per second.
    #[serde(default = "default_tick_rate_hz")]
    pub tick_rate_hz: u32,
    /// How long the help overlay stays visible, in seconds.
    #[serde(default = "default_help_seconds")]
    pub help_seconds: u32,
    /// Ticks to wait after a termination request before a forced kill.
    #[serde(default = "default_grace_ticks")]
    pub grace_ticks: u32,
    /// Key that stops the session and returns to the caller.
    #[serde(default = "default_terminate_key")]
    pub terminate_key: String,
    /// Key that shows the help overlay.
    #[serde(default = "default_help_key")]
    pub help_key: String,
}

fn default_tick_rate_hz() -> u32 {
    60
}

fn default_help_seconds() -> u32 {
    3
}

fn default_grace_ticks() -> u32 {
    30
}

fn default_terminate_key() -> String {
    "F10".into()
}

fn default_help_key() -> String {
    "F1".into()
}

impl Default for ControlSettings {
    fn default() -> Self {
        Self {
            tick_rate_hz: default_tick_rate_hz(),
            help_seconds: default_help_seconds(),
            grace_ticks: default_grace_ticks(),
            terminate_key: default_terminate_key(),
            help_key: default_help_key(),
        }
    }
}

impl ControlSettings {
    /// Wall-clock length of one supervisor tick.
    #[must_use]
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.tick_rate_hz.max(1)))
    }

    /// Help overlay duration expressed in ticks.
    #[must_use]
    pub fn help_ticks(&self) -> u32 {
        self.help_seconds.saturating_mul(self.tick_rate_hz)
    }

    /// Validate timing bounds and hotkey names.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the tick rate is out of range, a key
    /// name is unknown, or both actions share one key.
    pub fn validate(&self) -> Result<()> {
        if !(1..=1000).contains(&self.tick_rate_hz) {
            return Err(AppError::Config(format!(
                "tick_rate_hz must be between 1 and 1000, got {}",
                self.tick_rate_hz
            )));
        }

        let terminate = parse_key(&self.terminate_key)?;
        let help = parse_key(&self.help_key)?;
        if terminate == help {
            return Err(AppError::Config(
                "terminate_key and help_key must differ".into(),
            ));
        }

        Ok(())
    }
}

fn default_games_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_entry_points() -> Vec<String> {
    vec!["main.py".into(), "game.py".into(), "run.py".into()]
}

fn default_interpreter() -> String {
    "python3".into()
}

fn default_excluded_dirs() -> Vec<String> {
    vec!["__pycache__".into(), "FRONTEND".into()]
}

fn default_http_port() -> u16 {
    8000
}

fn default_bind_address() -> IpAddr {
    IpAddr::from([127, 0, 0, 1])
}

/// Launcher configuration parsed from `launcher.toml`.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct LauncherConfig {
    /// Directory whose subdirectories are the discoverable games.
    #[serde(default = "default_games_root")]
    pub games_root: PathBuf,
    /// Entry point file names, checked in order inside each game directory.
    #[serde(default = "default_entry_points")]
    pub entry_points: Vec<String>,
    /// Program used to run the entry point; empty runs it directly.
    #[serde(default = "default_interpreter")]
    pub interpreter: String,
    /// Extra arguments placed between the interpreter and the entry point.
    #[serde(default)]
    pub interpreter_args: Vec<String>,
    /// Directory names that are never treated as games.
    #[serde(default = "default_excluded_dirs")]
    pub excluded_dirs: Vec<String>,
    /// Where session manifests are written; the OS temp dir when unset.
    #[serde(default)]
    pub artifact_dir: Option<PathBuf>,
    /// HTTP port for the launch bridge.
    #[serde(default = "default_http_port")]
    pub http_port: u16,
    /// Address the launch bridge binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: IpAddr,
    /// Supervisor loop and hotkey settings.
    #[serde(default)]
    pub control: ControlSettings,
}

impl LauncherConfig {
    /// Build a configuration with every default applied for `games_root`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `games_root` does not exist.
    pub fn default_for(games_root: impl Into<PathBuf>) -> Result<Self> {
        let mut config = Self {
            games_root: games_root.into(),
            entry_points: default_entry_points(),
            interpreter: default_interpreter(),
            interpreter_args: Vec::new(),
            excluded_dirs: default_excluded_dirs(),
            artifact_dir: None,
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            control: ControlSettings::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load and validate configuration from a TOML file path.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if the file cannot be read or contains
    /// invalid TOML, or if validation fails.
    pub fn load_from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .map_err(|err| AppError::Config(format!("failed to read config: {err}")))?;
        Self::from_toml_str(&raw)
    }

    /// Parse configuration from a TOML string and normalize paths.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if parsing or validation fails.
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let mut config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Directory that receives session manifests.
    #[must_use]
    pub fn artifact_dir(&self) -> PathBuf {
        self.artifact_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    fn validate(&mut self) -> Result<()> {
        if self.entry_points.is_empty() {
            return Err(AppError::Config("entry_points must not be empty".into()));
        }

        if self
            .entry_points
            .iter()
            .any(|name| name.is_empty() || name.contains(['/', '\\']) || name == "..")
        {
            return Err(AppError::Config(
                "entry_points must be plain file names".into(),
            ));
        }

        self.control.validate()?;

        let canonical_root = self
            .games_root
            .canonicalize()
            .map_err(|err| AppError::Config(format!("games_root invalid: {err}")))?;
        self.games_root = canonical_root;

        Ok(())
    }
}
