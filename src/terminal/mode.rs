//! Reference-counted raw mode.
//!
//! Every component that needs raw input holds a [`RawModeGuard`]. Raw mode is
//! switched on when the first guard is acquired and the prior mode is restored
//! when the last guard drops, so the key interceptor's process-long guard and
//! a session's guard compose instead of toggling over each other.

use std::io;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use super::{SystemTerminal, TerminalBackend};

struct Inner {
    backend: Box<dyn TerminalBackend>,
    holders: usize,
    /// Whether raw mode was off before the first guard, and must be undone
    restore_on_release: bool,
}

/// Single owner of the terminal's raw/cooked state
#[derive(Clone)]
pub struct RawModeController {
    inner: Arc<Mutex<Inner>>,
}

impl RawModeController {
    pub fn new(backend: impl TerminalBackend + 'static) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner {
                backend: Box::new(backend),
                holders: 0,
                restore_on_release: false,
            })),
        }
    }

    /// Controller for the process' real terminal.
    pub fn system() -> Self {
        Self::new(SystemTerminal)
    }

    pub fn stdin_is_terminal(&self) -> bool {
        self.lock().backend.stdin_is_terminal()
    }

    pub fn stdout_is_terminal(&self) -> bool {
        self.lock().backend.stdout_is_terminal()
    }

    /// Both stdin and stdout are terminals.
    pub fn is_interactive(&self) -> bool {
        let inner = self.lock();
        inner.backend.stdin_is_terminal() && inner.backend.stdout_is_terminal()
    }

    /// Number of live guards.
    pub fn holders(&self) -> usize {
        self.lock().holders
    }

    /// Acquire raw mode.
    ///
    /// When stdin is not a terminal the returned guard is inert and the
    /// terminal is left untouched.
    pub fn acquire(&self) -> io::Result<RawModeGuard> {
        let mut inner = self.lock();
        if !inner.backend.stdin_is_terminal() {
            return Ok(RawModeGuard { controller: None });
        }

        if inner.holders == 0 {
            let already_raw = inner.backend.is_raw_mode_enabled().unwrap_or(false);
            if !already_raw {
                inner.backend.enable_raw_mode()?;
                debug!("raw mode enabled");
            }
            inner.restore_on_release = !already_raw;
        }
        inner.holders += 1;

        Ok(RawModeGuard {
            controller: Some(self.clone()),
        })
    }

    fn release(&self) {
        let mut inner = self.lock();
        inner.holders = inner.holders.saturating_sub(1);
        if inner.holders > 0 || !inner.restore_on_release {
            return;
        }

        inner.restore_on_release = false;
        match inner.backend.disable_raw_mode() {
            Ok(()) => debug!("raw mode restored"),
            Err(e) => warn!(error = %e, "failed to restore terminal mode"),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Keeps raw mode on while alive
pub struct RawModeGuard {
    controller: Option<RawModeController>,
}

impl RawModeGuard {
    /// False for the inert guard handed out on non-terminals.
    pub fn is_active(&self) -> bool {
        self.controller.is_some()
    }
}

impl Drop for RawModeGuard {
    fn drop(&mut self) {
        if let Some(controller) = self.controller.take() {
            controller.release();
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    /// Terminal double that records raw-mode transitions.
    #[derive(Clone, Default)]
    pub(crate) struct FakeTerminal {
        pub interactive: bool,
        /// Make `enable_raw_mode` fail
        pub fail_enable: bool,
        pub raw: Arc<Mutex<bool>>,
        pub transitions: Arc<Mutex<Vec<&'static str>>>,
    }

    impl FakeTerminal {
        pub(crate) fn interactive() -> Self {
            Self {
                interactive: true,
                ..Default::default()
            }
        }

        pub(crate) fn is_raw(&self) -> bool {
            *self.raw.lock().unwrap()
        }

        pub(crate) fn transitions(&self) -> Vec<&'static str> {
            self.transitions.lock().unwrap().clone()
        }
    }

    impl TerminalBackend for FakeTerminal {
        fn stdin_is_terminal(&self) -> bool {
            self.interactive
        }

        fn stdout_is_terminal(&self) -> bool {
            self.interactive
        }

        fn is_raw_mode_enabled(&self) -> io::Result<bool> {
            Ok(self.is_raw())
        }

        fn enable_raw_mode(&mut self) -> io::Result<()> {
            if self.fail_enable {
                return Err(io::Error::other("not a tty"));
            }
            *self.raw.lock().unwrap() = true;
            self.transitions.lock().unwrap().push("raw");
            Ok(())
        }

        fn disable_raw_mode(&mut self) -> io::Result<()> {
            *self.raw.lock().unwrap() = false;
            self.transitions.lock().unwrap().push("cooked");
            Ok(())
        }
    }

    #[test]
    fn nested_guards_toggle_mode_once() {
        let term = FakeTerminal::interactive();
        let controller = RawModeController::new(term.clone());

        let outer = controller.acquire().unwrap();
        assert!(term.is_raw());
        {
            let inner = controller.acquire().unwrap();
            assert!(inner.is_active());
            assert_eq!(controller.holders(), 2);
        }
        // Releasing the inner guard must not drop out of raw mode
        assert!(term.is_raw());
        drop(outer);

        assert!(!term.is_raw());
        assert_eq!(term.transitions(), vec!["raw", "cooked"]);
    }

    #[test]
    fn non_terminal_gets_inert_guard() {
        let term = FakeTerminal::default();
        let controller = RawModeController::new(term.clone());

        let guard = controller.acquire().unwrap();
        assert!(!guard.is_active());
        assert_eq!(controller.holders(), 0);
        drop(guard);
        assert!(term.transitions().is_empty());
    }

    #[test]
    fn preexisting_raw_mode_is_left_alone() {
        let term = FakeTerminal::interactive();
        *term.raw.lock().unwrap() = true;
        let controller = RawModeController::new(term.clone());

        drop(controller.acquire().unwrap());

        assert!(term.is_raw());
        assert!(term.transitions().is_empty());
    }

    #[test]
    fn failed_enable_leaves_no_holder() {
        let term = FakeTerminal {
            fail_enable: true,
            ..FakeTerminal::interactive()
        };
        let controller = RawModeController::new(term.clone());

        assert!(controller.acquire().is_err());
        assert_eq!(controller.holders(), 0);
        assert!(!term.is_raw());
    }

    #[test]
    fn guard_restores_mode_when_unwinding() {
        let term = FakeTerminal::interactive();
        let controller = RawModeController::new(term.clone());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = controller.acquire().unwrap();
            panic!("bridge setup failed");
        }));

        assert!(result.is_err());
        assert!(!term.is_raw());
    }
}
