// SPDX-License-Identifier: MIT
//
// Redisplay output staging.
//
// A redisplay pass is a run of small writes: a cursor motion, a few
// glyphs, an insert-character, a clear-to-end-of-line. They are collected
// here and leave in a single write, so the terminal never shows a
// half-updated line.
//
// Capabilities are emitted through the buffer too. The redisplay code asks
// for "3 x insert-character" and the buffer picks the parameterized form,
// the repeated single form, or reports that the terminal has neither, in
// which case the caller redraws the text instead.

use std::io::{self, Write};

use crate::caps::{Cap, Capabilities};

/// Terminal output accumulated for one redisplay pass.
#[derive(Debug, Clone, Default)]
pub struct OutputBuffer {
    bytes: Vec<u8>,
}

impl OutputBuffer {
    /// An empty buffer.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bytes: Vec::with_capacity(256),
        }
    }

    /// Bytes staged so far.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// True if nothing is staged.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Stage raw bytes (glyphs, or a control byte used as a fallback).
    pub fn put_bytes(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Stage `n` copies of `byte`, e.g. backspaces or blanks.
    pub fn put_repeated(&mut self, byte: u8, n: usize) {
        self.bytes.resize(self.bytes.len() + n, byte);
    }

    /// Stage `cap` once. Returns `false`, staging nothing, if the terminal
    /// lacks it.
    pub fn put_cap(&mut self, caps: &Capabilities, cap: Cap) -> bool {
        // Writes into a Vec do not fail.
        caps.write(&mut self.bytes, cap).unwrap_or(false)
    }

    /// Stage `cap` with a count of `n`.
    ///
    /// One repetition uses the single form when there is one. More use the
    /// parameterized form if the terminal has it, otherwise the single form
    /// `n` times. Returns `false` if the terminal has neither form.
    pub fn put_cap_n(&mut self, caps: &Capabilities, cap: Cap, n: usize) -> bool {
        if n == 0 {
            return true;
        }
        let parm = cap.parameterized().filter(|&p| caps.has(p));
        match (caps.has(cap), parm) {
            (true, _) if n == 1 => self.put_cap(caps, cap),
            (_, Some(parm)) => caps.write_n(&mut self.bytes, parm, n).unwrap_or(false),
            (true, None) => {
                for _ in 0..n {
                    self.put_cap(caps, cap);
                }
                true
            }
            (false, None) => false,
        }
    }

    /// Hand over the staged bytes, leaving the buffer empty.
    #[must_use]
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.bytes)
    }

    /// Write the staged bytes to `w`, flush it, and empty the buffer.
    /// Does not touch `w` when nothing is staged.
    ///
    /// # Errors
    ///
    /// Returns an error if writing to or flushing `w` fails. The bytes stay
    /// staged in that case.
    pub fn flush_to(&mut self, w: &mut dyn Write) -> io::Result<()> {
        if self.bytes.is_empty() {
            return Ok(());
        }
        w.write_all(&self.bytes)?;
        w.flush()?;
        self.bytes.clear();
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn glyphs_and_fallback_backspaces() {
        let mut out = OutputBuffer::new();
        out.put_bytes("é中".as_bytes());
        out.put_repeated(b'\x08', 3);
        assert_eq!(out.as_bytes(), "é中\x08\x08\x08".as_bytes());
    }

    #[test]
    fn missing_cap_stages_nothing() {
        let caps = Capabilities::dumb();
        let mut out = OutputBuffer::new();
        assert!(out.put_cap(&caps, Cap::CarriageReturn));
        assert!(!out.put_cap(&caps, Cap::ClearEol));
        assert!(!out.put_cap_n(&caps, Cap::InsertChar, 2));
        assert_eq!(out.as_bytes(), b"\r");
    }

    #[test]
    fn counted_cap_forms() {
        let caps = Capabilities::xterm();
        let mut out = OutputBuffer::new();
        assert!(out.put_cap_n(&caps, Cap::InsertChar, 1));
        assert_eq!(out.take(), b"\x1b[@".to_vec());
        assert!(out.put_cap_n(&caps, Cap::InsertChar, 3));
        assert_eq!(out.take(), b"\x1b[3@".to_vec());
        assert!(out.put_cap_n(&caps, Cap::InsertChar, 0));
        assert!(out.is_empty());
    }

    #[test]
    fn counted_cap_repeats_without_parameterized_form() {
        let mut caps = Capabilities::xterm();
        caps.remove(Cap::ParmDeleteChar);
        let mut out = OutputBuffer::new();
        assert!(out.put_cap_n(&caps, Cap::DeleteChar, 2));
        assert_eq!(out.as_bytes(), b"\x1b[P\x1b[P");
    }

    #[test]
    fn flush_sends_one_write_and_empties() {
        let mut out = OutputBuffer::new();
        out.put_bytes(b"ls");
        let mut term = Vec::new();
        out.flush_to(&mut term).unwrap();
        assert_eq!(term, b"ls");
        assert!(out.is_empty());
        out.flush_to(&mut term).unwrap();
        assert_eq!(term, b"ls");
    }

    struct Broken;

    impl Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::other("hangup"))
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_flush_keeps_output() {
        let mut out = OutputBuffer::new();
        out.put_bytes(b"x");
        assert!(out.flush_to(&mut Broken).is_err());
        assert_eq!(out.as_bytes(), b"x");
    }
}
