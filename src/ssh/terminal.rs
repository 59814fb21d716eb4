// ABOUTME: Local terminal control for interactive shells.
// ABOUTME: Raw mode is held by a guard that restores the previous mode when dropped.

use super::error::{Error, Result};
use std::io;

/// Fallback PTY size (columns, rows) when the local terminal cannot be queried.
pub const DEFAULT_SIZE: (u16, u16) = (80, 40);

/// The local terminal an interactive shell is bridged to.
pub trait LocalTerminal: Send + Sync {
    /// Current size as (columns, rows), if known.
    fn size(&self) -> Option<(u16, u16)>;

    fn enable_raw_mode(&self) -> io::Result<()>;

    fn disable_raw_mode(&self) -> io::Result<()>;
}

/// The process's controlling terminal, driven through crossterm.
#[derive(Debug, Clone, Copy, Default)]
pub struct CrosstermTerminal;

impl LocalTerminal for CrosstermTerminal {
    fn size(&self) -> Option<(u16, u16)> {
        crossterm::terminal::size()
            .ok()
            .filter(|&(cols, rows)| cols > 0 && rows > 0)
    }

    fn enable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}

/// Scoped raw mode. The prior terminal mode is restored exactly once, either
/// by [`RawModeGuard::restore`] or on drop.
pub struct RawModeGuard<'a, T: LocalTerminal + ?Sized> {
    terminal: &'a T,
    active: bool,
}

impl<'a, T: LocalTerminal + ?Sized> RawModeGuard<'a, T> {
    pub fn acquire(terminal: &'a T) -> Result<Self> {
        terminal.enable_raw_mode().map_err(Error::TerminalMode)?;
        Ok(Self {
            terminal,
            active: true,
        })
    }

    /// Restore the terminal now and report any failure.
    pub fn restore(mut self) -> Result<()> {
        self.active = false;
        self.terminal.disable_raw_mode().map_err(Error::TerminalMode)
    }
}

impl<T: LocalTerminal + ?Sized> Drop for RawModeGuard<'_, T> {
    fn drop(&mut self) {
        if self.active {
            self.active = false;
            if let Err(e) = self.terminal.disable_raw_mode() {
                tracing::warn!("failed to restore terminal mode: {}", e);
            }
        }
    }
}
