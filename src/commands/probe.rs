//! `test <alias>`: non-interactive reachability probe.
//!
//! The probe runs on a worker thread and posts its result into the event
//! loop, so Escape still cancels the CLI while the client is connecting.

use std::io::{self, Write};
use std::process::{Command, Stdio};
use std::sync::mpsc::Sender;
use std::thread;

use anyhow::Context;
use crossterm::style::Stylize;
use tracing::debug;

use crate::error::Result;
use crate::session::{LoopEvent, ProbeResult};

pub const SUCCESS_MESSAGE: &str = "Connection successful!";
pub const FAILURE_MESSAGE: &str = "Connection failed.";

/// Run `program args` with stdin and stdout discarded and stderr captured.
///
/// A spawn failure becomes a result with no exit code and the OS error as
/// its stderr.
pub fn run_probe(program: &str, args: &[String]) -> ProbeResult {
    let output = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output();

    match output {
        Ok(output) => ProbeResult {
            code: output.status.code(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
        },
        Err(e) => {
            debug!(program, error = %e, "probe failed to start");
            ProbeResult {
                code: None,
                stderr: e.to_string(),
            }
        }
    }
}

/// Run the probe on a worker thread and post `ProbeFinished` when done.
pub fn spawn_probe(program: String, args: Vec<String>, tx: Sender<LoopEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("probe".to_string())
        .spawn(move || {
            let result = run_probe(&program, &args);
            let _ = tx.send(LoopEvent::ProbeFinished(result));
        })?;
    Ok(())
}

/// Print the outcome. Returns whether the connection succeeded.
pub fn report(result: &ProbeResult, out: &mut dyn Write, err: &mut dyn Write) -> Result<bool> {
    if result.code == Some(0) {
        writeln!(out, "{}", SUCCESS_MESSAGE.green()).context("Failed to write probe result")?;
        return Ok(true);
    }

    writeln!(err, "{}", FAILURE_MESSAGE.red()).context("Failed to write probe result")?;
    let detail = result.stderr.trim();
    if !detail.is_empty() {
        writeln!(err, "{}", detail.grey()).context("Failed to write probe result")?;
    }
    Ok(false)
}
