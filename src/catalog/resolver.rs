//! Session descriptor resolver.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::path_safety::ensure_within_root;
use crate::config::LauncherConfig;
use crate::models::session::{SessionDescriptor, TargetCommand};
use crate::{AppError, Result};

/// Normalize an identifier or directory name for matching.
///
/// Trims surrounding whitespace, lowercases, and replaces inner spaces
/// with `-`, so `"  Space War "` and `"space-war"` compare equal.
#[must_use]
pub fn normalize_identifier(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "-")
}

/// Summary of one discoverable game.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct GameEntry {
    /// Normalized identifier accepted by `resolve`.
    pub id: String,
    /// Directory name as it appears on disk.
    pub display_name: String,
}

/// Read-only view over the games root.
#[derive(Debug, Clone)]
pub struct GameCatalog {
    root: PathBuf,
    entry_points: Vec<String>,
    excluded_dirs: Vec<String>,
    interpreter: String,
    interpreter_args: Vec<String>,
}

impl GameCatalog {
    /// Build a catalog from validated configuration.
    #[must_use]
    pub fn from_config(config: &LauncherConfig) -> Self {
        Self {
            root: config.games_root.clone(),
            entry_points: config.entry_points.clone(),
            excluded_dirs: config.excluded_dirs.clone(),
            interpreter: config.interpreter.clone(),
            interpreter_args: config.interpreter_args.clone(),
        }
    }

    /// Games root this catalog scans.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an identifier to a session descriptor.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if no game directory matches, the match
    /// has no entry point, or it resolves outside the games root.
    pub fn resolve(&self, identifier: &str) -> Result<SessionDescriptor> {
        let wanted = normalize_identifier(identifier);
        if wanted.is_empty() {
            return Err(AppError::NotFound("empty game identifier".into()));
        }

        let (name, dir) = self
            .candidate_dirs()?
            .into_iter()
            .find(|(name, _)| normalize_identifier(name) == wanted)
            .ok_or_else(|| AppError::NotFound(format!("no game matches '{}'", identifier.trim())))?;

        let working_directory = ensure_within_root(&self.root, &dir)?;
        let executable_path = self.entry_point_in(&working_directory).ok_or_else(|| {
            AppError::NotFound(format!("game '{name}' has no entry point"))
        })?;

        debug!(game = %name, entry = %executable_path.display(), "game resolved");

        Ok(SessionDescriptor {
            id: wanted,
            display_name: name,
            executable_path,
            working_directory,
        })
    }

    /// List every discoverable game, sorted by display name.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Io` if the games root cannot be read.
    pub fn list(&self) -> Result<Vec<GameEntry>> {
        Ok(self
            .candidate_dirs()?
            .into_iter()
            .filter(|(_, dir)| self.entry_point_in(dir).is_some())
            .map(|(name, _)| GameEntry {
                id: normalize_identifier(&name),
                display_name: name,
            })
            .collect())
    }

    /// Command line that starts the descriptor's entry point.
    #[must_use]
    pub fn command_for(&self, descriptor: &SessionDescriptor) -> TargetCommand {
        if self.interpreter.trim().is_empty() {
            return TargetCommand {
                program: descriptor.executable_path.clone(),
                args: Vec::new(),
            };
        }

        let mut args: Vec<PathBuf> = self.interpreter_args.iter().map(PathBuf::from).collect();
        args.push(descriptor.executable_path.clone());
        TargetCommand {
            program: PathBuf::from(&self.interpreter),
            args,
        }
    }

    /// First configured entry point that exists as a file in `dir`.
    fn entry_point_in(&self, dir: &Path) -> Option<PathBuf> {
        self.entry_points
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Directories under the root that may be games, sorted by name.
    fn candidate_dirs(&self) -> Result<Vec<(String, PathBuf)>> {
        let entries = fs::read_dir(&self.root).map_err(|err| {
            AppError::Io(format!(
                "cannot read games root {}: {err}",
                self.root.display()
            ))
        })?;

        let mut dirs: Vec<(String, PathBuf)> = entries
            .filter_map(std::result::Result::ok)
            .filter_map(|entry| {
                let path = entry.path();
                let name = entry.file_name().into_string().ok()?;
                (path.is_dir() && !self.is_excluded(&name)).then_some((name, path))
            })
            .collect();
        dirs.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(dirs)
    }

    fn is_excluded(&self, name: &str) -> bool {
        name.starts_with('.') || self.excluded_dirs.iter().any(|excluded| excluded == name)
    }
}
