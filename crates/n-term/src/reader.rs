// SPDX-License-Identifier: MIT
#![allow(unsafe_code)]
//
// Input pump — moves raw bytes from a file descriptor (or any reader) onto
// a channel the line editor can wait on with a deadline.
//
// The editor never reads a descriptor itself. Its hosts see the pump's
// receiver in one of two ways:
//
//   blocking host → wraps the receiver in a ChannelSource and lets
//                   read_line_blocking() pull chunks from it
//   driven host   → calls recv_timeout() with the editor's pending key
//                   sequence deadline and passes each chunk on
//
// End of input is the channel closing. Both hosts already treat a closed
// channel as EOF, so the pump has no separate "done" message.
//
// For stdin the thread polls with a short timeout and checks a stop flag
// between polls, so stop() never waits on a read that may not return.
// Generic readers get plain blocking reads; they are meant for pipes,
// files and tests, where a read always makes progress.

use std::io::{self, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, trace};

/// Largest chunk handed to the editor in one message. A keypress is a few
/// bytes; a paste arrives as several chunks of this size.
pub const CHUNK_SIZE: usize = 4096;

/// Stop-flag check interval for the stdin pump, in milliseconds.
const STOP_POLL_MS: i32 = 50;

/// A background thread feeding input chunks to a channel.
///
/// Every message on the channel is a non-empty chunk. The channel closes
/// when the input reaches end of file, fails, or the pump is stopped.
/// Dropping the pump stops it.
///
/// ```no_run
/// use n_term::reader::StdinReader;
/// use n_term::source::ChannelSource;
///
/// let (_pump, rx) = StdinReader::spawn()?;
/// let source = ChannelSource::new(rx);
/// # drop(source);
/// # Ok::<(), std::io::Error>(())
/// ```
#[derive(Debug)]
pub struct StdinReader {
    handle: Option<JoinHandle<()>>,
    stop: Arc<AtomicBool>,
}

impl StdinReader {
    /// Start pumping the process's standard input.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn() -> io::Result<(Self, Receiver<Vec<u8>>)> {
        Self::start("stdin-pump", pump_stdin)
    }

    /// Start pumping an arbitrary reader (a pipe, a file, a byte slice).
    ///
    /// Reads block, so [`stop`](Self::stop) takes effect once the current
    /// read returns.
    ///
    /// # Errors
    ///
    /// Returns an error if the thread cannot be spawned.
    pub fn spawn_from<R>(reader: R) -> io::Result<(Self, Receiver<Vec<u8>>)>
    where
        R: Read + Send + 'static,
    {
        Self::start("input-pump", move |tx, stop| pump_reader(reader, &tx, &stop))
    }

    fn start<F>(name: &str, body: F) -> io::Result<(Self, Receiver<Vec<u8>>)>
    where
        F: FnOnce(Sender<Vec<u8>>, Arc<AtomicBool>) + Send + 'static,
    {
        let (tx, rx) = mpsc::channel();
        let stop = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&stop);
        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || body(tx, flag))?;
        debug!(name, "input pump started");
        Ok((
            Self {
                handle: Some(handle),
                stop,
            },
            rx,
        ))
    }

    /// Ask the thread to finish and wait for it. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                debug!("input pump panicked");
            }
        }
    }

    /// True until the thread has been joined.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        self.handle.is_some()
    }
}

impl Drop for StdinReader {
    fn drop(&mut self) {
        self.stop();
    }
}

// ─── Pump loops ─────────────────────────────────────────────────────────────

/// Forward one chunk. Returns `false` when nobody is listening any more.
fn forward(tx: &Sender<Vec<u8>>, bytes: &[u8]) -> bool {
    trace!(len = bytes.len(), "input chunk");
    tx.send(bytes.to_vec()).is_ok()
}

fn pump_reader<R: Read>(mut reader: R, tx: &Sender<Vec<u8>>, stop: &AtomicBool) {
    let mut buf = [0u8; CHUNK_SIZE];
    while !stop.load(Ordering::Relaxed) {
        match reader.read(&mut buf) {
            Ok(0) => {
                debug!("input reached end of file");
                break;
            }
            Ok(n) => {
                if !forward(tx, &buf[..n]) {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => {
                debug!("input read failed: {e}");
                break;
            }
        }
    }
}

#[cfg(unix)]
#[allow(clippy::needless_pass_by_value)] // moved into the thread
fn pump_stdin(tx: Sender<Vec<u8>>, stop: Arc<AtomicBool>) {
    use std::os::unix::io::AsRawFd;

    let fd = io::stdin().as_raw_fd();
    let mut buf = [0u8; CHUNK_SIZE];

    while !stop.load(Ordering::Relaxed) {
        let mut pfd = libc::pollfd {
            fd,
            events: libc::POLLIN,
            revents: 0,
        };
        let ready = unsafe { libc::poll(&raw mut pfd, 1, STOP_POLL_MS) };
        if ready < 0 {
            if io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
                continue;
            }
            debug!("poll on stdin failed");
            break;
        }
        if ready == 0 {
            continue;
        }

        let n = unsafe { libc::read(fd, buf.as_mut_ptr().cast(), buf.len()) };
        if n < 0 && io::Error::last_os_error().kind() == io::ErrorKind::Interrupted {
            continue;
        }
        if n <= 0 {
            debug!("stdin closed");
            break;
        }
        #[allow(clippy::cast_sign_loss)] // n > 0
        let len = n as usize;
        if !forward(&tx, &buf[..len]) {
            break;
        }
    }
}

#[cfg(not(unix))]
#[allow(clippy::needless_pass_by_value)]
fn pump_stdin(tx: Sender<Vec<u8>>, stop: Arc<AtomicBool>) {
    pump_reader(io::stdin(), &tx, &stop);
}

// ─── Tests ───────────────────────────────────────────────────────────────────
