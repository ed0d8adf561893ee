//! Hotkey names and key-event classification.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::config::ControlSettings;
use crate::models::control::ControlSignal;
use crate::{AppError, Result};

/// Parse a configured key name into a crossterm key code.
///
/// Accepts `F1`..`F12`, `Esc`/`Escape`, `Enter`, `Tab`, and any single
/// character (matched case-insensitively).
///
/// # Errors
///
/// Returns `AppError::Config` for names outside that set.
pub fn parse_key(name: &str) -> Result<KeyCode> {
    let trimmed = name.trim();
    let lowered = trimmed.to_ascii_lowercase();

    let mut chars = trimmed.chars();
    if let (Some(ch), None) = (chars.next(), chars.next()) {
        return Ok(KeyCode::Char(ch.to_ascii_lowercase()));
    }

    match lowered.as_str() {
        "esc" | "escape" => Ok(KeyCode::Esc),
        "enter" | "return" => Ok(KeyCode::Enter),
        "tab" => Ok(KeyCode::Tab),
        other => other
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=12).contains(n))
            .map(KeyCode::F)
            .ok_or_else(|| AppError::Config(format!("unknown key name '{trimmed}'"))),
    }
}

/// Key bindings for the two operator commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hotkeys {
    /// Key mapped to [`ControlSignal::Terminate`].
    pub terminate: KeyCode,
    /// Key mapped to [`ControlSignal::ShowHelp`].
    pub help: KeyCode,
    terminate_label: String,
    help_label: String,
}

impl Hotkeys {
    /// Build bindings from control settings.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if either key name is unknown.
    pub fn from_settings(settings: &ControlSettings) -> Result<Self> {
        Ok(Self {
            terminate: parse_key(&settings.terminate_key)?,
            help: parse_key(&settings.help_key)?,
            terminate_label: settings.terminate_key.trim().to_owned(),
            help_label: settings.help_key.trim().to_owned(),
        })
    }

    /// Human-readable name of the terminate key, as configured.
    #[must_use]
    pub fn terminate_label(&self) -> &str {
        &self.terminate_label
    }

    /// Human-readable name of the help key, as configured.
    #[must_use]
    pub fn help_label(&self) -> &str {
        &self.help_label
    }

    /// Map one key event onto a control signal.
    ///
    /// Only presses count; releases and repeats are ignored. `Ctrl-C` always
    /// terminates because the surface runs in raw mode and would otherwise
    /// swallow it.
    #[must_use]
    pub fn classify(&self, event: &KeyEvent) -> Option<ControlSignal> {
        if event.kind != KeyEventKind::Press {
            return None;
        }

        if event.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(event.code, KeyCode::Char('c' | 'C'))
        {
            return Some(ControlSignal::Terminate);
        }

        let code = match event.code {
            KeyCode::Char(ch) => KeyCode::Char(ch.to_ascii_lowercase()),
            other => other,
        };

        if code == self.terminate {
            Some(ControlSignal::Terminate)
        } else if code == self.help {
            Some(ControlSignal::ShowHelp)
        } else {
            None
        }
    }
}
