//! Games-root containment checks.
//!
//! Canonicalizes a discovered directory and rejects anything that resolves
//! outside the games root, including symlinked game directories pointing
//! elsewhere on disk.

use std::path::{Path, PathBuf};

use crate::{AppError, Result};

/// Validate that `candidate` resolves to a location inside `root`.
///
/// Both paths are canonicalized so symlinks are followed before the
/// containment check. Returns the canonical candidate on success.
///
/// # Errors
///
/// Returns `AppError::NotFound` if either path cannot be resolved or the
/// candidate escapes the root.
pub fn ensure_within_root(root: &Path, candidate: &Path) -> Result<PathBuf> {
    let root = root
        .canonicalize()
        .map_err(|err| AppError::NotFound(format!("games root unavailable: {err}")))?;

    let resolved = candidate
        .canonicalize()
        .map_err(|err| AppError::NotFound(format!("cannot resolve game directory: {err}")))?;

    if resolved == root || !resolved.starts_with(&root) {
        return Err(AppError::NotFound(
            "game directory resolves outside the games root".into(),
        ));
    }

    Ok(resolved)
}
