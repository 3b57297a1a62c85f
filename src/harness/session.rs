use std::io::{self, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::Duration;

use tracing::debug;

/// One event from the spawned interpreter's streams.
#[derive(Debug)]
pub enum StreamEvent {
    Stdout(String),
    Stderr(String),
    /// One per stream; the process is done once both have arrived.
    Eof,
}

/// A running interpreter process. The generated program is passed as a
/// direct argument (no temp file); stdout and stderr are pumped by reader
/// threads into one event channel.
pub struct InterpreterSession {
    child: Child,
    events: Receiver<StreamEvent>,
    killed: bool,
}

impl InterpreterSession {
    pub fn spawn(argv: &[String], program: &str) -> io::Result<Self> {
        if argv.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "empty interpreter command",
            ));
        }

        let mut child = Command::new(&argv[0])
            .args(&argv[1..])
            .arg(program)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()?;

        debug!(command = %argv.join(" "), pid = child.id(), "interpreter spawned");

        let stdout = child.stdout.take().expect("no stdout");
        let stderr = child.stderr.take().expect("no stderr");

        let (tx, rx) = channel::<StreamEvent>();
        let out_tx = tx.clone();
        thread::spawn(move || pump(stdout, out_tx, StreamEvent::Stdout));
        thread::spawn(move || pump(stderr, tx, StreamEvent::Stderr));

        Ok(Self {
            child,
            events: rx,
            killed: false,
        })
    }

    pub fn recv_timeout(&self, wait: Duration) -> Result<StreamEvent, RecvTimeoutError> {
        self.events.recv_timeout(wait)
    }

    /// Forcibly terminate the process. Killing an already-exited process is
    /// a no-op.
    pub fn kill(&mut self) {
        if self.killed {
            return;
        }
        self.killed = true;
        if let Err(e) = self.child.kill() {
            debug!(error = %e, "kill after exit ignored");
        }
    }

    pub fn wait(&mut self) -> io::Result<ExitStatus> {
        self.child.wait()
    }
}

fn pump<R: Read>(mut reader: R, tx: Sender<StreamEvent>, wrap: fn(String) -> StreamEvent) {
    let mut buf = [0u8; 4096];
    loop {
        match reader.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                let text = String::from_utf8_lossy(&buf[..n]).into_owned();
                if tx.send(wrap(text)).is_err() {
                    return;
                }
            }
        }
    }
    let _ = tx.send(StreamEvent::Eof);
}
