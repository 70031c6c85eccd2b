//! Terminal console: stdin on a helper thread, stdout written directly

use std::io::{self, BufRead, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::{Receiver, TryRecvError};
use net_transport::{Console, TransportResult};
use tracing::{debug, warn};

/// Console backed by the process's stdin and stdout.
///
/// Line-buffered terminal input arrives with `\n` line endings; those are
/// handed to the channel as carriage returns, the way a serial terminal
/// would send them. Once stdin hits EOF and every typed character has been
/// consumed, the shared stop flag is raised.
pub struct StdioConsole {
    input: Receiver<u8>,
    stdout: Stdout,
    stop: Arc<AtomicBool>,
}

impl StdioConsole {
    pub fn spawn(stop: Arc<AtomicBool>) -> io::Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();

        thread::Builder::new()
            .name("stdin-reader".to_string())
            .spawn(move || {
                let mut stdin = io::stdin().lock();
                loop {
                    let chunk = match stdin.fill_buf() {
                        Ok([]) => break,
                        Ok(chunk) => chunk.to_vec(),
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                        Err(e) => {
                            warn!("stdin read failed: {}", e);
                            break;
                        }
                    };
                    stdin.consume(chunk.len());
                    for c in chunk {
                        let c = if c == b'\n' { b'\r' } else { c };
                        if tx.send(c).is_err() {
                            return;
                        }
                    }
                }
                debug!("stdin closed");
            })?;

        Ok(Self {
            input: rx,
            stdout: io::stdout(),
            stop,
        })
    }

    /// Print a full line outside the character stream
    pub fn announce(&mut self, line: &str) -> io::Result<()> {
        let mut out = self.stdout.lock();
        writeln!(out, "{}", line)?;
        out.flush()
    }
}

impl Console for StdioConsole {
    fn read_char(&mut self) -> TransportResult<Option<u8>> {
        match self.input.try_recv() {
            Ok(c) => Ok(Some(c)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => {
                if !self.stop.swap(true, Ordering::Relaxed) {
                    debug!("Console input exhausted, stopping");
                }
                Ok(None)
            }
        }
    }

    fn write_char(&mut self, c: u8) -> TransportResult<()> {
        let mut out = self.stdout.lock();
        out.write_all(&[c])?;
        out.flush()?;
        Ok(())
    }
}
