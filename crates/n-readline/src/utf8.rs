//! Incremental UTF-8 assembly.
//!
//! Keys arrive one byte at a time and a multi-byte character may be split
//! across reads (or across driven-mode calls). [`Utf8Decoder`] holds the
//! partial sequence between bytes so self-insert and the search query
//! editors only ever see whole characters.

/// What feeding one byte produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    /// A complete character.
    Char(char),
    /// The byte was consumed; more are needed.
    Incomplete,
    /// The bytes so far can never form a character. The decoder is reset.
    Invalid,
    /// A half-read character was cut off by a byte that cannot continue
    /// it. The partial sequence is dropped and the byte is *not* consumed:
    /// the caller should process it again as a fresh key.
    Interrupted,
}

/// A UTF-8 accumulator for one byte stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Utf8Decoder {
    buf: [u8; 4],
    len: usize,
    expected: usize,
}

impl Utf8Decoder {
    /// An empty decoder.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            buf: [0; 4],
            len: 0,
            expected: 0,
        }
    }

    /// True while a multi-byte character is half-read.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        self.len > 0
    }

    /// Drop any partial sequence.
    pub const fn reset(&mut self) {
        self.len = 0;
        self.expected = 0;
    }

    /// Feed one byte.
    pub fn push(&mut self, byte: u8) -> Decoded {
        if self.len == 0 {
            let expected = char_len(byte);
            match expected {
                0 => return Decoded::Invalid,
                1 => return Decoded::Char(char::from(byte)),
                _ => {
                    self.buf[0] = byte;
                    self.len = 1;
                    self.expected = expected;
                    return Decoded::Incomplete;
                }
            }
        }

        if !is_continuation(byte) {
            self.reset();
            return Decoded::Interrupted;
        }
        self.buf[self.len] = byte;
        self.len += 1;
        if self.len < self.expected {
            return Decoded::Incomplete;
        }

        let decoded = std::str::from_utf8(&self.buf[..self.len])
            .ok()
            .and_then(|s| s.chars().next())
            .map_or(Decoded::Invalid, Decoded::Char);
        self.reset();
        decoded
    }
}

/// True for bytes of the form 0b10xxxxxx.
#[must_use]
pub const fn is_continuation(byte: u8) -> bool {
    byte & 0xC0 == 0x80
}

/// Expected byte length of a UTF-8 character from its lead byte.
/// Returns 0 for invalid lead bytes (continuation bytes, 0xF8..=0xFF).
const fn char_len(lead: u8) -> usize {
    match lead {
        0x00..=0x7F => 1,
        0xC0..=0xDF => 2,
        0xE0..=0xEF => 3,
        0xF0..=0xF7 => 4,
        _ => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(dec: &mut Utf8Decoder, bytes: &[u8]) -> Vec<Decoded> {
        bytes.iter().map(|&b| dec.push(b)).collect()
    }

    #[test]
    fn ascii_is_immediate() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(b'a'), Decoded::Char('a'));
        assert!(!dec.is_pending());
    }

    #[test]
    fn three_byte_char_assembles() {
        let mut dec = Utf8Decoder::new();
        let out = feed(&mut dec, "中".as_bytes());
        assert_eq!(
            out,
            vec![Decoded::Incomplete, Decoded::Incomplete, Decoded::Char('中')]
        );
    }

    #[test]
    fn four_byte_char_assembles() {
        let mut dec = Utf8Decoder::new();
        let out = feed(&mut dec, "🔥".as_bytes());
        assert_eq!(out.last(), Some(&Decoded::Char('🔥')));
    }

    #[test]
    fn stray_continuation_is_invalid() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(0x80), Decoded::Invalid);
    }

    #[test]
    fn cut_off_sequence_leaves_byte_unconsumed() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(0xE4), Decoded::Incomplete);
        assert_eq!(dec.push(b'a'), Decoded::Interrupted);
        assert!(!dec.is_pending());
        assert_eq!(dec.push(b'a'), Decoded::Char('a'));
    }

    #[test]
    fn new_lead_byte_interrupts() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(dec.push(0xC3), Decoded::Incomplete);
        assert_eq!(dec.push(0xC3), Decoded::Interrupted);
        assert_eq!(feed(&mut dec, "é".as_bytes()).last(), Some(&Decoded::Char('é')));
    }

    #[test]
    fn overlong_encoding_rejected() {
        let mut dec = Utf8Decoder::new();
        assert_eq!(feed(&mut dec, &[0xC0, 0x80]).last(), Some(&Decoded::Invalid));
    }
}
