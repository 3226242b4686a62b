//! Interactive session orchestration.
//!
//! `SessionOrchestrator` owns the process' session state, event bus and key
//! interceptor. `run` spawns the remote-login client, bridges the parent's
//! stdin/stdout/stderr to it, forwards terminal resizes by signal, and
//! restores everything once the child has exited and its output drained.
//!
//! Only one session may run per orchestrator; a second `run` while one is
//! active fails with [`SshyaError::SessionActive`].

use std::io::{self, Read, Write};
use std::sync::mpsc::Sender;

use anyhow::Context;
use tracing::{debug, info, warn};

use super::event_loop::{
    spawn_exit_watcher, spawn_input_pump, spawn_output_pump, EventBus, LoopEvent, ProbeResult,
    ResizeWatch, StreamKind,
};
use super::process::{ProcessLauncher, SpawnedChild, SystemLauncher};
use super::state::SessionState;
use crate::error::{Result, SshyaError};
use crate::input::{KeyDecision, KeyInterceptor};
use crate::ssh::command::FORCE_PTY_FLAG;
use crate::ssh::CommandBuilder;
use crate::store::{Connection, ConnectionStore};
use crate::terminal::{RawModeController, RawModeGuard};

/// Summary of a finished session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionReport {
    /// Exit code to mirror: the child's, or 0 when it had none
    pub exit_code: i32,
    /// Whether `lastUsed` was stamped
    pub usage_recorded: bool,
    /// Why stamping `lastUsed` failed, if it did
    pub usage_error: Option<String>,
    pub resizes_forwarded: usize,
    /// Resize signals that could not be delivered (child already gone)
    pub resize_failures: usize,
    /// Why waiting on the child failed, if it did
    pub wait_error: Option<String>,
}

impl SessionReport {
    /// Emit the warnings held back while the terminal was bridged. Call once
    /// the terminal is back in its prior mode.
    pub fn log_deferred(&self, alias: &str) {
        if let Some(error) = &self.usage_error {
            warn!(alias, %error, "failed to record connection usage");
        }
        if let Some(error) = &self.wait_error {
            warn!(alias, %error, "failed to wait for child");
        }
    }
}

/// How a wait outside a session ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdleOutcome {
    /// The user pressed Escape or Ctrl+C
    Cancelled,
    Probe(ProbeResult),
    /// No event source is left
    Disconnected,
}

pub struct SessionOrchestrator<L: ProcessLauncher = SystemLauncher> {
    store: ConnectionStore,
    builder: CommandBuilder,
    launcher: L,
    /// Remote-login client binary
    program: String,
    state: SessionState,
    terminal: RawModeController,
    bus: EventBus,
    interceptor: Option<KeyInterceptor>,
    /// Raw mode held for the interceptor's whole lifetime
    _interceptor_guard: Option<RawModeGuard>,
    /// Input source; `None` means the process' stdin
    input: Option<Box<dyn Read + Send>>,
    input_attached: bool,
    stdout: Box<dyn Write + Send>,
    stderr: Box<dyn Write + Send>,
}

impl<L: ProcessLauncher> SessionOrchestrator<L> {
    pub fn new(
        store: ConnectionStore,
        builder: CommandBuilder,
        launcher: L,
        program: impl Into<String>,
        terminal: RawModeController,
    ) -> Self {
        Self {
            store,
            builder,
            launcher,
            program: program.into(),
            state: SessionState::new(),
            terminal,
            bus: EventBus::new(),
            interceptor: None,
            _interceptor_guard: None,
            input: None,
            input_attached: false,
            stdout: Box::new(io::stdout()),
            stderr: Box::new(io::stderr()),
        }
    }

    /// Redirect where child output is written.
    pub fn with_output(mut self, stdout: Box<dyn Write + Send>, stderr: Box<dyn Write + Send>) -> Self {
        self.stdout = stdout;
        self.stderr = stderr;
        self
    }

    /// Read input from `reader` instead of the process' stdin.
    pub fn with_input(mut self, reader: Box<dyn Read + Send>) -> Self {
        self.input = Some(reader);
        self
    }

    /// Handle to the shared session state.
    pub fn state(&self) -> SessionState {
        self.state.clone()
    }

    pub fn is_active(&self) -> bool {
        self.state.is_active()
    }

    pub fn store(&self) -> &ConnectionStore {
        &self.store
    }

    /// Sender for posting events into the loop.
    pub fn event_sender(&self) -> Sender<LoopEvent> {
        self.bus.sender()
    }

    /// Install the process-wide key interceptor when both stdin and stdout
    /// are terminals. Returns whether it was installed.
    pub fn install_interceptor(&mut self) -> Result<bool> {
        if self.interceptor.is_some() || !self.terminal.is_interactive() {
            return Ok(false);
        }

        let guard = self
            .terminal
            .acquire()
            .context("Failed to enable raw mode - are you in a terminal?")?;
        self._interceptor_guard = Some(guard);
        self.interceptor = Some(KeyInterceptor::new(self.state()));
        self.attach_input()?;
        Ok(true)
    }

    /// Drop the interceptor and its raw-mode guard, e.g. before printing
    /// line-oriented output.
    pub fn release_interceptor(&mut self) {
        self.interceptor = None;
        self._interceptor_guard = None;
    }

    /// Use a specific interceptor without touching the terminal or stdin.
    pub fn set_interceptor(&mut self, interceptor: KeyInterceptor) {
        self.interceptor = Some(interceptor);
    }

    /// Start forwarding input into the loop. Idempotent.
    pub fn attach_input(&mut self) -> Result<()> {
        if self.input_attached {
            return Ok(());
        }
        let reader = self.input.take().unwrap_or_else(|| Box::new(io::stdin()));
        spawn_input_pump(reader, self.bus.sender()).context("Failed to start stdin reader")?;
        self.input_attached = true;
        Ok(())
    }

    /// Launch an interactive session for `connection` and block until it ends.
    ///
    /// The caller mirrors `SessionReport::exit_code` as the process exit code,
    /// or exits with 1 on error.
    pub fn run(&mut self, alias: &str, connection: &Connection) -> Result<SessionReport> {
        let ticket = self.state.begin()?;
        let args = self.session_args(connection);

        info!(alias, program = %self.program, "launching session");
        let child = self.launcher.spawn(&self.program, &args).map_err(|source| {
            debug!(program = %self.program, error = %source, "spawn failed");
            SshyaError::Spawn {
                program: self.program.clone(),
                source,
            }
        })?;
        let pid = child.pid;
        ticket.mark_running(pid);
        debug!(pid, "child running");

        let mut report = SessionReport::default();
        match self.store.record_usage(alias) {
            Ok(recorded) => report.usage_recorded = recorded,
            Err(e) => {
                debug!(alias, error = %e, "failed to record connection usage");
                report.usage_error = Some(e.to_string());
            }
        }

        match self.bridge(child, &mut report) {
            Ok(exit_code) => report.exit_code = exit_code,
            Err(e) => {
                // Bridging failed after spawn; do not leave the child orphaned
                if let Err(errno) = self.launcher.hangup(pid) {
                    debug!(pid, %errno, "hangup not delivered");
                }
                return Err(e);
            }
        }

        drop(ticket);
        info!(alias, exit_code = report.exit_code, "session ended");
        Ok(report)
    }

    /// Builder arguments plus a forced remote pty when the local terminal is
    /// interactive. The child's stdin is a pipe, so the client never
    /// allocates one unasked.
    fn session_args(&self, connection: &Connection) -> Vec<String> {
        let mut args = self.builder.args(connection);
        if self.terminal.is_interactive() && !args.iter().any(|a| a == FORCE_PTY_FLAG) {
            args.insert(0, FORCE_PTY_FLAG.to_string());
        }
        args
    }

    /// Drain events while no session is active, until the user cancels or a
    /// probe finishes.
    pub fn wait_idle(&mut self) -> IdleOutcome {
        while let Some(event) = self.bus.next() {
            match event {
                LoopEvent::Input(chunk) => {
                    let cancelled = self
                        .interceptor
                        .as_mut()
                        .is_some_and(|i| i.on_input(&chunk) == KeyDecision::Cancel);
                    if cancelled {
                        return IdleOutcome::Cancelled;
                    }
                }
                LoopEvent::ProbeFinished(result) => return IdleOutcome::Probe(result),
                other => debug!(?other, "event ignored while idle"),
            }
        }
        IdleOutcome::Disconnected
    }

    fn bridge(&mut self, child: SpawnedChild, report: &mut SessionReport) -> Result<i32> {
        let SpawnedChild {
            pid,
            stdin,
            stdout,
            stderr,
            waiter,
        } = child;

        let raw_guard = self
            .terminal
            .acquire()
            .context("Failed to enable raw mode")?;

        self.attach_input()?;
        let tx = self.bus.sender();
        spawn_output_pump(stdout, StreamKind::Stdout, tx.clone()).context("Failed to bridge stdout")?;
        spawn_output_pump(stderr, StreamKind::Stderr, tx.clone()).context("Failed to bridge stderr")?;
        spawn_exit_watcher(waiter, tx.clone()).context("Failed to watch child exit")?;

        let resize_watch = if self.terminal.stdout_is_terminal() {
            Some(ResizeWatch::install(tx).context("Failed to watch terminal resizes")?)
        } else {
            None
        };

        let mut child_stdin = Some(stdin);
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut exit = None;

        while exit.is_none() || stdout_open || stderr_open {
            let Some(event) = self.bus.next() else {
                break;
            };
            match event {
                LoopEvent::Input(chunk) => self.forward_input(&mut child_stdin, &chunk),
                LoopEvent::InputClosed => child_stdin = None,
                LoopEvent::Output(kind, chunk) => self.write_output(kind, &chunk),
                LoopEvent::OutputClosed(StreamKind::Stdout) => stdout_open = false,
                LoopEvent::OutputClosed(StreamKind::Stderr) => stderr_open = false,
                LoopEvent::Exited(status) => exit = Some(status),
                LoopEvent::Resize => match self.launcher.signal_resize(pid) {
                    Ok(()) => report.resizes_forwarded += 1,
                    Err(errno) => {
                        debug!(pid, %errno, "resize signal not delivered");
                        report.resize_failures += 1;
                    }
                },
                LoopEvent::ProbeFinished(_) => {}
            }
        }

        // Cleanup: stop resize forwarding, detach input, restore the terminal
        drop(resize_watch);
        drop(child_stdin);
        drop(raw_guard);
        let _ = self.stdout.flush();
        let _ = self.stderr.flush();

        let exit_code = match exit {
            Some(Ok(code)) => code.unwrap_or(0),
            Some(Err(e)) => {
                debug!(pid, error = %e, "failed to wait for child");
                report.wait_error = Some(e.to_string());
                1
            }
            None => 0,
        };
        Ok(exit_code)
    }

    fn forward_input(&mut self, child_stdin: &mut Option<Box<dyn Write + Send>>, chunk: &[u8]) {
        if let Some(interceptor) = self.interceptor.as_mut() {
            if interceptor.on_input(chunk) != KeyDecision::Forward {
                return;
            }
        }

        let Some(writer) = child_stdin.as_mut() else {
            return;
        };
        if let Err(e) = writer.write_all(chunk).and_then(|()| writer.flush()) {
            debug!(error = %e, "child stdin closed, detaching input");
            *child_stdin = None;
        }
    }

    fn write_output(&mut self, kind: StreamKind, chunk: &[u8]) {
        let out = match kind {
            StreamKind::Stdout => &mut self.stdout,
            StreamKind::Stderr => &mut self.stderr,
        };
        if let Err(e) = out.write_all(chunk).and_then(|()| out.flush()) {
            debug!(?kind, error = %e, "failed to write child output");
        }
    }
}
