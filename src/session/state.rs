//! Shared session state.
//!
//! One `SessionState` is created per process and handed to both the
//! orchestrator and the key interceptor. A session counts as active from the
//! moment a launch begins (before the child exists) until cleanup.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::{Result, SshyaError};

/// Lifecycle phase of the single remote session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    #[default]
    Idle,
    /// Launch requested, child not yet running
    Spawning,
    Running {
        pid: u32,
    },
}

#[derive(Debug, Clone, Default)]
pub struct SessionState {
    phase: Arc<Mutex<SessionPhase>>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> SessionPhase {
        *self.lock()
    }

    /// True while spawning or running.
    pub fn is_active(&self) -> bool {
        self.phase() != SessionPhase::Idle
    }

    /// Move from idle to spawning. Fails if a session is already active.
    pub(crate) fn begin(&self) -> Result<SessionTicket> {
        let mut phase = self.lock();
        if *phase != SessionPhase::Idle {
            return Err(SshyaError::SessionActive);
        }
        *phase = SessionPhase::Spawning;
        Ok(SessionTicket {
            state: self.clone(),
        })
    }

    fn lock(&self) -> MutexGuard<'_, SessionPhase> {
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Exclusive right to the session slot. Dropping it returns the state to idle.
#[derive(Debug)]
pub(crate) struct SessionTicket {
    state: SessionState,
}

impl SessionTicket {
    pub(crate) fn mark_running(&self, pid: u32) {
        *self.state.lock() = SessionPhase::Running { pid };
    }
}

impl Drop for SessionTicket {
    fn drop(&mut self) {
        *self.state.lock() = SessionPhase::Idle;
    }
}
