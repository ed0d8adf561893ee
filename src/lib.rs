#![forbid(unsafe_code)]

//! Supervised game launcher.
//!
//! Resolves a game identifier to a directory under the games root, runs
//! the game as a supervised child with an operator hotkey that returns
//! control to the caller, and guarantees cleanup on every exit path. A
//! small HTTP bridge can start the same kind of session remotely.

pub mod bridge;
pub mod catalog;
pub mod config;
pub mod control;
pub mod errors;
pub mod models;
pub mod orchestrator;

pub use config::LauncherConfig;
pub use errors::{AppError, Result};
