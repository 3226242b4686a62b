//! Child-process launching for remote-login sessions.
//!
//! The orchestrator only sees a [`ProcessLauncher`], so tests can drive it
//! against an in-memory child.

use std::io::{self, Read, Write};
use std::process::{Child, Command, Stdio};

use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;

/// Blocks until the child exits and yields its exit code, if it has one.
pub trait ChildWaiter: Send {
    fn wait(self: Box<Self>) -> io::Result<Option<i32>>;
}

/// A spawned child with all three standard streams piped
pub struct SpawnedChild {
    pub pid: u32,
    pub stdin: Box<dyn Write + Send>,
    pub stdout: Box<dyn Read + Send>,
    pub stderr: Box<dyn Read + Send>,
    pub waiter: Box<dyn ChildWaiter>,
}

/// Spawns children and delivers signals to them by pid.
pub trait ProcessLauncher {
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<SpawnedChild>;

    /// Deliver a window-size-change signal.
    fn signal_resize(&self, pid: u32) -> Result<(), Errno>;

    /// Ask an orphaned child to hang up.
    fn hangup(&self, pid: u32) -> Result<(), Errno>;
}

/// Launches real processes with `std::process`
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl ProcessLauncher for SystemLauncher {
    fn spawn(&self, program: &str, args: &[String]) -> io::Result<SpawnedChild> {
        let mut child = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        let (Some(stdin), Some(stdout), Some(stderr)) =
            (child.stdin.take(), child.stdout.take(), child.stderr.take())
        else {
            let _ = child.kill();
            let _ = child.wait();
            return Err(io::Error::new(io::ErrorKind::Other, "child stdio was not piped"));
        };

        Ok(SpawnedChild {
            pid: child.id(),
            stdin: Box::new(stdin),
            stdout: Box::new(stdout),
            stderr: Box::new(stderr),
            waiter: Box::new(StdWaiter(child)),
        })
    }

    fn signal_resize(&self, pid: u32) -> Result<(), Errno> {
        send_signal(pid, Signal::SIGWINCH)
    }

    fn hangup(&self, pid: u32) -> Result<(), Errno> {
        send_signal(pid, Signal::SIGHUP)
    }
}

struct StdWaiter(Child);

impl ChildWaiter for StdWaiter {
    fn wait(mut self: Box<Self>) -> io::Result<Option<i32>> {
        Ok(self.0.wait()?.code())
    }
}

fn send_signal(pid: u32, signal: Signal) -> Result<(), Errno> {
    let raw = i32::try_from(pid).map_err(|_| Errno::ESRCH)?;
    kill(Pid::from_raw(raw), signal)
}
