//! Session manifest ("wrapper artifact") generation.
//!
//! A manifest is a JSON document describing one session: the resolved
//! descriptor, the exact command to run, and the control settings. The
//! generic `supervise` entry point reads it back as data, so nothing in a
//! game name or file name is ever evaluated.

use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::config::ControlSettings;
use crate::models::session::{SessionDescriptor, TargetCommand};
use crate::{AppError, Result};

/// Manifest format version written by this build.
pub const MANIFEST_VERSION: u32 = 1;

/// File name prefix for generated manifests.
pub const MANIFEST_PREFIX: &str = "arcade-session-";

/// File name suffix for generated manifests.
pub const MANIFEST_SUFFIX: &str = ".json";

/// Everything a supervisor needs to run one session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct SessionManifest {
    /// Format version; must equal [`MANIFEST_VERSION`].
    pub version: u32,
    /// Unique session identifier.
    pub session_id: String,
    /// Generation timestamp.
    pub created_at: DateTime<Utc>,
    /// Resolved game.
    pub descriptor: SessionDescriptor,
    /// Child command line.
    pub command: TargetCommand,
    /// Loop timing and hotkeys.
    pub control: ControlSettings,
}

impl SessionManifest {
    /// Construct a manifest with a fresh session identifier.
    #[must_use]
    pub fn new(
        descriptor: SessionDescriptor,
        command: TargetCommand,
        control: ControlSettings,
    ) -> Self {
        Self {
            version: MANIFEST_VERSION,
            session_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            descriptor,
            command,
            control,
        }
    }
}

/// On-disk manifest owned by exactly one session.
///
/// Only an ephemeral artifact is ever deleted. A path handed in from
/// outside is ephemeral only when it lies in the launcher's manifest
/// namespace: prefixed name, `.json` suffix, directly inside the artifact
/// directory. Anything else is read but never removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrapperArtifact {
    path: PathBuf,
    ephemeral: bool,
}

impl WrapperArtifact {
    /// Claim an existing manifest, e.g. one handed to a detached
    /// supervisor on its command line.
    #[must_use]
    pub fn claim(path: impl Into<PathBuf>, artifact_dir: &Path) -> Self {
        let path = path.into();
        let ephemeral = in_namespace(&path, artifact_dir);
        if !ephemeral {
            warn!(path = %path.display(), "manifest outside the artifact namespace; it will not be removed");
        }
        Self { path, ephemeral }
    }

    fn generated(path: PathBuf) -> Self {
        Self {
            path,
            ephemeral: true,
        }
    }

    /// Location of the manifest.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether the artifact must be deleted at session end.
    #[must_use]
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }

    /// Whether the manifest is still on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read and validate the manifest.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Generation` if the file is unreadable, is not a
    /// manifest, or has an unsupported version.
    pub fn load(&self) -> Result<SessionManifest> {
        let raw = fs::read(&self.path).map_err(|err| {
            AppError::Generation(format!(
                "cannot read manifest {}: {err}",
                self.path.display()
            ))
        })?;
        let manifest: SessionManifest = serde_json::from_slice(&raw)?;
        if manifest.version != MANIFEST_VERSION {
            return Err(AppError::Generation(format!(
                "unsupported manifest version {}",
                manifest.version
            )));
        }
        Ok(manifest)
    }

    /// Delete the manifest. Returns `Ok(false)` if it was already gone.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error for any failure other than
    /// "not found".
    pub fn remove(&self) -> io::Result<bool> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Write `manifest` into `dir` as a new, uniquely named file.
///
/// The file is created exclusively; a partially written file is removed
/// before the error is returned.
///
/// # Errors
///
/// Returns `AppError::Generation` if the directory or file cannot be
/// created or written.
pub fn generate(dir: &Path, manifest: &SessionManifest) -> Result<WrapperArtifact> {
    fs::create_dir_all(dir).map_err(|err| {
        AppError::Generation(format!(
            "cannot create artifact dir {}: {err}",
            dir.display()
        ))
    })?;

    let path = dir.join(format!(
        "{MANIFEST_PREFIX}{}{MANIFEST_SUFFIX}",
        manifest.session_id
    ));
    let file = open_exclusive(&path).map_err(|err| {
        AppError::Generation(format!("cannot create {}: {err}", path.display()))
    })?;

    let artifact = WrapperArtifact::generated(path.clone());
    let mut writer = BufWriter::new(file);
    let written = serde_json::to_writer_pretty(&mut writer, manifest)
        .map_err(io::Error::from)
        .and_then(|()| writer.flush());

    if let Err(err) = written {
        let _ = artifact.remove();
        return Err(AppError::Generation(format!(
            "cannot write {}: {err}",
            path.display()
        )));
    }

    debug!(session_id = %manifest.session_id, path = %path.display(), "session manifest written");
    Ok(artifact)
}

/// Whether `path` names a manifest file directly inside `artifact_dir`.
fn in_namespace(path: &Path, artifact_dir: &Path) -> bool {
    let named = path
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| {
            name.len() > MANIFEST_PREFIX.len() + MANIFEST_SUFFIX.len()
                && name.starts_with(MANIFEST_PREFIX)
                && name.ends_with(MANIFEST_SUFFIX)
        });
    if !named {
        return false;
    }

    // The resolved file must sit in the artifact dir under the same name.
    let Ok(resolved) = path.canonicalize() else {
        return false;
    };
    let Ok(dir) = artifact_dir.canonicalize() else {
        return false;
    };
    resolved.parent() == Some(dir.as_path())
        && resolved.file_name() == path.file_name()
}

#[cfg(unix)]
fn open_exclusive(path: &Path) -> io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_exclusive(path: &Path) -> io::Result<fs::File> {
    OpenOptions::new().write(true).create_new(true).open(path)
}
