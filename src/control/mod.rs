//! Operator control channel.
//!
//! A small surface, separate from the game's own window, that captures
//! key presses and shows a transient help overlay. The channel knows
//! nothing about the child process; it only turns key presses into
//! [`ControlSignal`]s for the supervisor loop.

pub mod hotkey;
pub mod terminal;

use std::io;

use crossterm::event::KeyEvent;
use tracing::{debug, warn};

use crate::models::control::ControlSignal;

pub use hotkey::{parse_key, Hotkeys};
pub use terminal::{open_surface, CrosstermSurface, HeadlessSurface, TerminalSource};

/// Input and drawing backend behind the control channel.
pub trait ControlSurface {
    /// Drain every pending key event without blocking.
    ///
    /// # Errors
    ///
    /// Returns the backend's I/O error if the input queue cannot be read.
    fn drain_keys(&mut self) -> io::Result<Vec<KeyEvent>>;

    /// Draw the overlay text, or clear it when `overlay` is `None`.
    ///
    /// # Errors
    ///
    /// Returns the backend's I/O error if drawing fails.
    fn render_overlay(&mut self, overlay: Option<&str>) -> io::Result<()>;
}

impl<S: ControlSurface + ?Sized> ControlSurface for Box<S> {
    fn drain_keys(&mut self) -> io::Result<Vec<KeyEvent>> {
        (**self).drain_keys()
    }

    fn render_overlay(&mut self, overlay: Option<&str>) -> io::Result<()> {
        (**self).render_overlay(overlay)
    }
}

/// Key classification plus the help overlay countdown.
pub struct ControlChannel<S> {
    surface: S,
    hotkeys: Hotkeys,
    help_text: String,
    help_ticks: u32,
    help_remaining: u32,
    overlay_visible: bool,
}

impl<S: ControlSurface> ControlChannel<S> {
    /// Create a channel whose help overlay is armed for its full duration,
    /// so the operator sees the terminate key as soon as a session starts.
    pub fn new(surface: S, hotkeys: Hotkeys, help_ticks: u32) -> Self {
        let help_text = format!(
            "Press {} to return to launcher ({} for help)",
            hotkeys.terminate_label(),
            hotkeys.help_label()
        );
        Self {
            surface,
            hotkeys,
            help_text,
            help_ticks,
            help_remaining: help_ticks,
            overlay_visible: false,
        }
    }

    /// Drain pending key presses and classify them.
    ///
    /// Input errors are logged and yield no signals for this tick.
    pub fn poll_signals(&mut self) -> Vec<ControlSignal> {
        match self.surface.drain_keys() {
            Ok(keys) => keys
                .iter()
                .filter_map(|key| self.hotkeys.classify(key))
                .collect(),
            Err(err) => {
                warn!(%err, "failed to read control input");
                Vec::new()
            }
        }
    }

    /// Re-arm the help overlay for the full duration.
    ///
    /// A repeated request while the overlay is visible restarts the
    /// countdown; it never extends past one full duration.
    pub fn show_help(&mut self) {
        self.help_remaining = self.help_ticks;
    }

    /// Ticks left before the overlay hides.
    #[must_use]
    pub fn help_remaining(&self) -> u32 {
        self.help_remaining
    }

    /// Whether the overlay is currently on screen.
    #[must_use]
    pub fn overlay_visible(&self) -> bool {
        self.overlay_visible
    }

    /// Text shown in the overlay.
    #[must_use]
    pub fn help_text(&self) -> &str {
        &self.help_text
    }

    /// Advance the overlay countdown by one tick, drawing or clearing it.
    pub fn render_tick(&mut self) {
        if self.help_remaining > 0 {
            if let Err(err) = self.surface.render_overlay(Some(&self.help_text)) {
                debug!(%err, "overlay draw failed");
            }
            self.overlay_visible = true;
            self.help_remaining -= 1;
        } else if self.overlay_visible {
            if let Err(err) = self.surface.render_overlay(None) {
                debug!(%err, "overlay clear failed");
            }
            self.overlay_visible = false;
        }
    }

    /// Borrow the underlying surface.
    #[must_use]
    pub fn surface(&self) -> &S {
        &self.surface
    }
}
