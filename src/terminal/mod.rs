//! Controlling-terminal access.
//!
//! - `TerminalBackend` - the operations the session layer needs from a tty
//! - `SystemTerminal` - crossterm-backed implementation
//! - `RawModeController` - single owner of raw/cooked mode switching

use std::io::{self, IsTerminal};

pub mod mode;

pub use mode::{RawModeController, RawModeGuard};

/// Terminal operations used by the session layer.
pub trait TerminalBackend: Send {
    fn stdin_is_terminal(&self) -> bool;
    fn stdout_is_terminal(&self) -> bool;
    fn is_raw_mode_enabled(&self) -> io::Result<bool>;
    fn enable_raw_mode(&mut self) -> io::Result<()>;
    fn disable_raw_mode(&mut self) -> io::Result<()>;
}

/// The process' real controlling terminal
#[derive(Debug, Default)]
pub struct SystemTerminal;

impl TerminalBackend for SystemTerminal {
    fn stdin_is_terminal(&self) -> bool {
        io::stdin().is_terminal()
    }

    fn stdout_is_terminal(&self) -> bool {
        io::stdout().is_terminal()
    }

    fn is_raw_mode_enabled(&self) -> io::Result<bool> {
        crossterm::terminal::is_raw_mode_enabled()
    }

    fn enable_raw_mode(&mut self) -> io::Result<()> {
        crossterm::terminal::enable_raw_mode()
    }

    fn disable_raw_mode(&mut self) -> io::Result<()> {
        crossterm::terminal::disable_raw_mode()
    }
}
