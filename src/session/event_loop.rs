//! Event sources for the single consumer loop.
//!
//! Blocking reads (stdin, child output, child exit, SIGWINCH) each run on a
//! small pump thread that only forwards what it sees into one channel. All
//! handling happens serially on the thread that drains [`EventBus`].

use std::io::{self, Read};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use signal_hook::consts::SIGWINCH;
use signal_hook::iterator::{Handle, Signals};
use tracing::debug;

use super::process::ChildWaiter;

/// Which child output stream a chunk came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Result of a one-off reachability probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub code: Option<i32>,
    pub stderr: String,
}

/// Everything the loop reacts to
#[derive(Debug)]
pub enum LoopEvent {
    /// Bytes read from the parent's stdin
    Input(Vec<u8>),
    /// Parent's stdin reached EOF
    InputClosed,
    /// Bytes from the child's stdout or stderr
    Output(StreamKind, Vec<u8>),
    /// A child output stream reached EOF
    OutputClosed(StreamKind),
    /// The child exited (or waiting on it failed)
    Exited(io::Result<Option<i32>>),
    /// The parent's terminal was resized
    Resize,
    /// A background probe finished
    ProbeFinished(ProbeResult),
}

/// Channel shared by every pump and drained by the loop
pub struct EventBus {
    tx: Sender<LoopEvent>,
    rx: Receiver<LoopEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self { tx, rx }
    }

    pub fn sender(&self) -> Sender<LoopEvent> {
        self.tx.clone()
    }

    /// Block for the next event. The bus keeps its own sender, so this only
    /// fails if that invariant is broken.
    pub fn next(&self) -> Option<LoopEvent> {
        self.rx.recv().ok()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Forward the parent's input (normally stdin) as raw chunks until EOF.
pub fn spawn_input_pump(reader: Box<dyn Read + Send>, tx: Sender<LoopEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("stdin-pump".to_string())
        .spawn(move || {
            let mut reader = reader;
            pump(&mut reader, &tx, LoopEvent::Input, || LoopEvent::InputClosed);
        })?;
    Ok(())
}

/// Forward one child output stream until EOF.
pub fn spawn_output_pump(
    reader: Box<dyn Read + Send>,
    kind: StreamKind,
    tx: Sender<LoopEvent>,
) -> io::Result<()> {
    let name = match kind {
        StreamKind::Stdout => "child-stdout",
        StreamKind::Stderr => "child-stderr",
    };
    thread::Builder::new().name(name.to_string()).spawn(move || {
        let mut reader = reader;
        pump(
            &mut reader,
            &tx,
            |chunk| LoopEvent::Output(kind, chunk),
            || LoopEvent::OutputClosed(kind),
        );
    })?;
    Ok(())
}

/// Wait for the child on a separate thread and post its exit.
pub fn spawn_exit_watcher(waiter: Box<dyn ChildWaiter>, tx: Sender<LoopEvent>) -> io::Result<()> {
    thread::Builder::new()
        .name("child-wait".to_string())
        .spawn(move || {
            let _ = tx.send(LoopEvent::Exited(waiter.wait()));
        })?;
    Ok(())
}

fn pump<R, C, E>(reader: &mut R, tx: &Sender<LoopEvent>, chunk: C, eof: E)
where
    R: Read + ?Sized,
    C: Fn(Vec<u8>) -> LoopEvent,
    E: FnOnce() -> LoopEvent,
{
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) => break, // EOF
            Ok(n) => {
                if tx.send(chunk(buf[..n].to_vec())).is_err() {
                    return; // Loop gone
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => {
                debug!(error = %e, "pump read failed");
                break;
            }
        }
    }
    let _ = tx.send(eof());
}

/// SIGWINCH observer; stops when dropped.
pub struct ResizeWatch {
    handle: Handle,
}

impl ResizeWatch {
    pub fn install(tx: Sender<LoopEvent>) -> io::Result<Self> {
        let mut signals = Signals::new([SIGWINCH])?;
        let handle = signals.handle();

        thread::Builder::new()
            .name("resize-watch".to_string())
            .spawn(move || {
                for _ in signals.forever() {
                    if tx.send(LoopEvent::Resize).is_err() {
                        break;
                    }
                }
            })?;

        Ok(Self { handle })
    }
}

impl Drop for ResizeWatch {
    fn drop(&mut self) {
        self.handle.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn output_pump_forwards_chunks_then_closes() {
        let bus = EventBus::new();
        spawn_output_pump(Box::new(Cursor::new(b"abc".to_vec())), StreamKind::Stderr, bus.sender())
            .unwrap();

        match bus.next().unwrap() {
            LoopEvent::Output(StreamKind::Stderr, bytes) => assert_eq!(bytes, b"abc"),
            other => panic!("unexpected event: {other:?}"),
        }
        assert!(matches!(
            bus.next().unwrap(),
            LoopEvent::OutputClosed(StreamKind::Stderr)
        ));
    }

    #[test]
    fn input_pump_reports_eof_as_input_closed() {
        let bus = EventBus::new();
        spawn_input_pump(Box::new(Cursor::new(b"\x1b".to_vec())), bus.sender()).unwrap();

        assert!(matches!(bus.next().unwrap(), LoopEvent::Input(bytes) if bytes == b"\x1b"));
        assert!(matches!(bus.next().unwrap(), LoopEvent::InputClosed));
    }

    #[test]
    fn empty_stream_only_reports_closure() {
        let bus = EventBus::new();
        spawn_output_pump(Box::new(io::empty()), StreamKind::Stdout, bus.sender()).unwrap();
        assert!(matches!(
            bus.next().unwrap(),
            LoopEvent::OutputClosed(StreamKind::Stdout)
        ));
    }
}
