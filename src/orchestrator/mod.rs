//! Session orchestration modules.
//!
//! Covers session manifest generation, child process spawning, the
//! supervisor state machine, and the cleanup coordinator.

pub mod artifact;
pub mod cleanup;
pub mod spawner;
pub mod supervisor;
