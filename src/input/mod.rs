//! Global Escape / Ctrl+C handling.
//!
//! Raw mode suppresses the terminal's own interrupt signal, so cancel keys
//! arrive as plain bytes. While no session is active they cancel the CLI;
//! while one is active they belong to the remote program.

use std::io::{self, Write};

use tracing::debug;

use crate::session::SessionState;

/// Exit code used when the user cancels an idle CLI.
pub const CANCEL_EXIT_CODE: i32 = 0;

pub const CANCEL_NOTICE: &str = "Cancelled by user.";

/// A decoded keypress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keypress {
    Escape,
    CtrlC,
    Other,
}

impl Keypress {
    /// Decode one raw input chunk.
    ///
    /// A lone ESC byte is Escape; ESC followed by more bytes is an escape
    /// sequence (arrow keys, Alt chords) and is not. Ctrl+C counts anywhere
    /// in the chunk, since it may share a read with type-ahead.
    pub fn decode(chunk: &[u8]) -> Self {
        if chunk == [0x1b] {
            Keypress::Escape
        } else if chunk.contains(&0x03) {
            Keypress::CtrlC
        } else {
            Keypress::Other
        }
    }

    pub fn is_cancel(self) -> bool {
        matches!(self, Keypress::Escape | Keypress::CtrlC)
    }
}

/// What the loop should do with an input chunk
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDecision {
    /// A session is active; hand the bytes to the child
    Forward,
    /// Idle and not a cancel key
    Ignore,
    /// Idle cancel key; the CLI must exit with [`CANCEL_EXIT_CODE`]
    Cancel,
}

/// Process-wide cancel-key observer
pub struct KeyInterceptor {
    state: SessionState,
    notice: Box<dyn Write + Send>,
}

impl KeyInterceptor {
    pub fn new(state: SessionState) -> Self {
        Self::with_notice(state, Box::new(io::stdout()))
    }

    /// Interceptor that prints its cancellation notice to `notice`.
    pub fn with_notice(state: SessionState, notice: Box<dyn Write + Send>) -> Self {
        Self { state, notice }
    }

    /// Classify an input chunk against the current session state.
    pub fn on_input(&mut self, chunk: &[u8]) -> KeyDecision {
        if self.state.is_active() {
            return KeyDecision::Forward;
        }

        let key = Keypress::decode(chunk);
        if !key.is_cancel() {
            return KeyDecision::Ignore;
        }

        debug!(?key, "cancel key while idle");
        // Raw mode: no implicit carriage return on newline
        let _ = write!(self.notice, "\r\n{CANCEL_NOTICE}\r\n");
        let _ = self.notice.flush();
        KeyDecision::Cancel
    }
}
