//! Operator commands produced by the control channel.

use serde::{Deserialize, Serialize};

/// A command emitted by the control channel and consumed once by the
/// supervisor loop.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ControlSignal {
    /// Stop the session and return to the caller.
    Terminate,
    /// Show (or re-arm) the help overlay.
    ShowHelp,
}
