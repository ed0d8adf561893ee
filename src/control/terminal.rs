//! Terminal-backed control surface.

use std::io::{self, IsTerminal, Write};
use std::time::Duration;

use crossterm::cursor::{MoveTo, RestorePosition, SavePosition};
use crossterm::event::{self, Event, KeyEvent};
use crossterm::style::{Attribute, Print, SetAttribute};
use crossterm::terminal::{disable_raw_mode, enable_raw_mode, Clear, ClearType, SetTitle};
use crossterm::{execute, queue};
use tracing::{info, warn};

use super::ControlSurface;

/// Where a surface finds its terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalSource {
    /// The process's own stdin, as for a direct launch.
    Stdin,
    /// The controlling terminal (`/dev/tty`), for supervisors started with
    /// a detached stdin that still share the operator's terminal.
    ControllingTty,
}

/// Raw-mode terminal surface drawing its overlay on the top line.
///
/// Raw mode is restored when the surface is dropped. With a detached stdin
/// crossterm reads keys from `/dev/tty`, which is also where the overlay
/// goes.
pub struct CrosstermSurface {
    out: Box<dyn Write>,
}

impl CrosstermSurface {
    /// Put the terminal into raw mode and set the window title.
    ///
    /// # Errors
    ///
    /// Returns an error if the requested terminal is unavailable or raw
    /// mode cannot be enabled.
    pub fn open(title: &str, source: TerminalSource) -> io::Result<Self> {
        let mut out: Box<dyn Write> = match source {
            TerminalSource::Stdin if io::stdin().is_terminal() => Box::new(io::stderr()),
            TerminalSource::Stdin => {
                return Err(io::Error::new(
                    io::ErrorKind::Unsupported,
                    "stdin is not a terminal",
                ))
            }
            TerminalSource::ControllingTty => Box::new(controlling_tty()?),
        };

        enable_raw_mode()?;
        let _ = execute!(out, SetTitle(title));
        Ok(Self { out })
    }
}

#[cfg(unix)]
fn controlling_tty() -> io::Result<std::fs::File> {
    std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open("/dev/tty")
}

#[cfg(not(unix))]
fn controlling_tty() -> io::Result<std::fs::File> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "no controlling terminal on this platform",
    ))
}

impl ControlSurface for CrosstermSurface {
    fn drain_keys(&mut self) -> io::Result<Vec<KeyEvent>> {
        let mut keys = Vec::new();
        while event::poll(Duration::ZERO)? {
            if let Event::Key(key) = event::read()? {
                keys.push(key);
            }
        }
        Ok(keys)
    }

    fn render_overlay(&mut self, overlay: Option<&str>) -> io::Result<()> {
        queue!(self.out, SavePosition, MoveTo(0, 0), Clear(ClearType::CurrentLine))?;
        if let Some(text) = overlay {
            queue!(
                self.out,
                SetAttribute(Attribute::Reverse),
                Print(text),
                SetAttribute(Attribute::Reset)
            )?;
        }
        queue!(self.out, RestorePosition)?;
        self.out.flush()
    }
}

impl Drop for CrosstermSurface {
    fn drop(&mut self) {
        let _ = self.render_overlay(None);
        let _ = disable_raw_mode();
    }
}

/// Surface for sessions without an interactive terminal.
///
/// Produces no key events; the overlay text is logged once per showing.
#[derive(Debug, Default)]
pub struct HeadlessSurface {
    announced: bool,
}

impl ControlSurface for HeadlessSurface {
    fn drain_keys(&mut self) -> io::Result<Vec<KeyEvent>> {
        Ok(Vec::new())
    }

    fn render_overlay(&mut self, overlay: Option<&str>) -> io::Result<()> {
        match overlay {
            Some(text) if !self.announced => {
                info!(overlay = text, "headless control surface");
                self.announced = true;
            }
            Some(_) => {}
            None => self.announced = false,
        }
        Ok(())
    }
}

/// Open the terminal surface, falling back to a headless one.
#[must_use]
pub fn open_surface(title: &str, source: TerminalSource) -> Box<dyn ControlSurface> {
    match CrosstermSurface::open(title, source) {
        Ok(surface) => Box::new(surface),
        Err(err) => {
            warn!(%err, "no interactive terminal; control hotkeys disabled");
            Box::new(HeadlessSurface::default())
        }
    }
}
