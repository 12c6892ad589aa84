// SPDX-License-Identifier: MIT
//
// Byte sources — where a blocking line read gets its input from.
//
// The line editor's blocking entry point needs exactly one thing from the
// outside world: "give me the next chunk of bytes, waiting at most this
// long". That is the `ByteSource` trait. Two implementations ship here:
//
//   ChannelSource — wraps the receiver end of `StdinReader`, so a blocking
//                   read is a `recv_timeout()` on the chunk channel.
//   ScriptSource  — a pre-recorded list of chunks (and optional timeouts),
//                   for tests and for replaying input deterministically.

use std::collections::VecDeque;
use std::io;
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::Duration;

// ─── ByteSource ─────────────────────────────────────────────────────────────

/// Result of one read from a [`ByteSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadStatus {
    /// At least one byte was read.
    Bytes(Vec<u8>),
    /// The timeout expired with no input.
    TimedOut,
    /// The source is exhausted.
    Eof,
}

/// A blocking source of raw terminal bytes.
pub trait ByteSource {
    /// Wait for the next chunk of input.
    ///
    /// `timeout == None` blocks until bytes arrive or the source ends.
    /// Implementations must never return an empty [`ReadStatus::Bytes`].
    ///
    /// # Errors
    ///
    /// Returns an error if the underlying device fails.
    fn read_chunk(&mut self, timeout: Option<Duration>) -> io::Result<ReadStatus>;
}

// ─── ChannelSource ──────────────────────────────────────────────────────────

/// A byte source fed by a channel of chunks (e.g. from
/// [`StdinReader`](crate::reader::StdinReader)).
pub struct ChannelSource {
    rx: Receiver<Vec<u8>>,
}

impl ChannelSource {
    /// Wrap a chunk receiver.
    #[must_use]
    pub const fn new(rx: Receiver<Vec<u8>>) -> Self {
        Self { rx }
    }
}

impl ByteSource for ChannelSource {
    fn read_chunk(&mut self, timeout: Option<Duration>) -> io::Result<ReadStatus> {
        loop {
            let chunk = match timeout {
                Some(t) => match self.rx.recv_timeout(t) {
                    Ok(chunk) => chunk,
                    Err(RecvTimeoutError::Timeout) => return Ok(ReadStatus::TimedOut),
                    Err(RecvTimeoutError::Disconnected) => return Ok(ReadStatus::Eof),
                },
                None => match self.rx.recv() {
                    Ok(chunk) => chunk,
                    Err(_) => return Ok(ReadStatus::Eof),
                },
            };
            if !chunk.is_empty() {
                return Ok(ReadStatus::Bytes(chunk));
            }
        }
    }
}

// ─── ScriptSource ───────────────────────────────────────────────────────────

/// One scripted event.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Scripted {
    Chunk(Vec<u8>),
    Pause,
}

/// A pre-recorded byte source.
///
/// Chunks are delivered in order, one per read. A scripted pause makes the
/// next read that has a timeout report [`ReadStatus::TimedOut`]; a read
/// without a timeout skips the pause (nobody was waiting on the clock).
/// After the script runs out every read reports [`ReadStatus::Eof`].
#[derive(Debug, Clone, Default)]
pub struct ScriptSource {
    script: VecDeque<Scripted>,
}

impl ScriptSource {
    /// An empty script (immediate EOF).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A script delivering `bytes` one byte per read, which is the
    /// harshest way to split input.
    #[must_use]
    pub fn bytewise(bytes: &[u8]) -> Self {
        let mut src = Self::new();
        for &b in bytes {
            src.push_chunk(&[b]);
        }
        src
    }

    /// Append a chunk to the script. Empty chunks are ignored.
    pub fn push_chunk(&mut self, bytes: &[u8]) -> &mut Self {
        if !bytes.is_empty() {
            self.script.push_back(Scripted::Chunk(bytes.to_vec()));
        }
        self
    }

    /// Append a pause (observed only by reads with a timeout).
    pub fn push_pause(&mut self) -> &mut Self {
        self.script.push_back(Scripted::Pause);
        self
    }

    /// True if every scripted event has been consumed.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.script.is_empty()
    }
}

impl ByteSource for ScriptSource {
    fn read_chunk(&mut self, timeout: Option<Duration>) -> io::Result<ReadStatus> {
        while let Some(event) = self.script.pop_front() {
            match event {
                Scripted::Chunk(bytes) => return Ok(ReadStatus::Bytes(bytes)),
                Scripted::Pause if timeout.is_some() => return Ok(ReadStatus::TimedOut),
                Scripted::Pause => {}
            }
        }
        Ok(ReadStatus::Eof)
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
