use std::io::{BufRead, BufReader};
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};

use log::debug;

use crate::capture::buffer::CHANNEL_COUNT;
use crate::capture::{CaptureError, LineSource};

/// Default name of the external measurement binary.
pub const DEFAULT_INSTRUMENT: &str = "./OpenTimeInstrument";

/// Builds the instrument invocation for the given device path.
pub fn instrument_command(program: &Path, device: &str) -> Command {
    let channels: Vec<String> = (1..=CHANNEL_COUNT).map(|c| c.to_string()).collect();
    let mut command = Command::new(program);
    command
        .arg("-d")
        .arg(device)
        .arg("-e")
        .arg(channels.join(","))
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::null());
    command
}

/// Line source backed by a running instrument subprocess.
///
/// A reader thread drains the child's stdout into an mpsc channel so the
/// polling tick never blocks on the pipe. Buffered lines are still
/// delivered after the child exits; only a drained, disconnected channel
/// reports the source as closed.
pub struct InstrumentSource {
    child: Child,
    lines: Receiver<String>,
    reader: Option<JoinHandle<()>>,
}

impl InstrumentSource {
    pub fn spawn(program: &Path, device: &str) -> Result<Self, CaptureError> {
        let mut child = instrument_command(program, device)
            .spawn()
            .map_err(CaptureError::SourceUnavailable)?;
        let stdout = child.stdout.take().ok_or_else(|| {
            CaptureError::SourceUnavailable(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "child stdout was not captured",
            ))
        })?;
        let (tx, rx) = mpsc::channel();
        let reader = thread::spawn(move || {
            for line in BufReader::new(stdout).lines() {
                match line {
                    Ok(line) => {
                        if tx.send(line).is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        debug!("instrument stdout read failed: {e}");
                        break;
                    }
                }
            }
        });
        Ok(Self {
            child,
            lines: rx,
            reader: Some(reader),
        })
    }
}

impl LineSource for InstrumentSource {
    fn try_read_line(&mut self) -> Result<Option<String>, CaptureError> {
        match self.lines.try_recv() {
            Ok(line) => Ok(Some(line)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(CaptureError::SourceClosed),
        }
    }
}

impl Drop for InstrumentSource {
    fn drop(&mut self) {
        // The child may already have exited on its own.
        if let Err(e) = self.child.kill() {
            debug!("instrument process kill: {e}");
        }
        if let Err(e) = self.child.wait() {
            debug!("instrument process wait: {e}");
        }
        if let Some(reader) = self.reader.take() {
            let _ = reader.join();
        }
    }
}
