//! Remote-login session lifecycle.
//!
//! This module provides:
//! - `SessionState` - the shared idle/spawning/running phase
//! - `SessionOrchestrator` - spawns the client and bridges the terminal to it
//! - Event pumps feeding the single consumer loop

pub mod event_loop;
pub mod orchestrator;
pub mod process;
pub mod state;

pub use event_loop::{EventBus, LoopEvent, ProbeResult, StreamKind};
pub use orchestrator::{IdleOutcome, SessionOrchestrator, SessionReport};
pub use process::{ProcessLauncher, SystemLauncher};
pub use state::{SessionPhase, SessionState};
