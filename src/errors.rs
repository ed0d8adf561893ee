//! Error types shared across the application.

use std::fmt::{Display, Formatter};

/// Shared application result type.
pub type Result<T> = std::result::Result<T, AppError>;

/// Application error enumeration covering all domain failure modes.
#[derive(Debug)]
pub enum AppError {
    /// Configuration parsing or validation failure.
    Config(String),
    /// Identifier has no matching, valid game directory.
    NotFound(String),
    /// Session manifest could not be written or read back.
    Generation(String),
    /// Target or supervisor process could not be started.
    Spawn(String),
    /// Launch bridge failed to bind or serve.
    Bridge(String),
    /// File-system or terminal I/O failure.
    Io(String),
}

impl Display for AppError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "config: {msg}"),
            Self::NotFound(msg) => write!(f, "not found: {msg}"),
            Self::Generation(msg) => write!(f, "generation: {msg}"),
            Self::Spawn(msg) => write!(f, "spawn: {msg}"),
            Self::Bridge(msg) => write!(f, "bridge: {msg}"),
            Self::Io(msg) => write!(f, "io: {msg}"),
        }
    }
}

impl std::error::Error for AppError {}

impl From<toml::de::Error> for AppError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(format!("invalid config: {err}"))
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        Self::Generation(format!("invalid session manifest: {err}"))
    }
}
