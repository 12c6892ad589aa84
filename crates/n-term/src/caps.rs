// SPDX-License-Identifier: MIT
//
// Terminal capabilities — the named control sequences a line editor needs.
//
// A capability table maps short termcap-style names ("ce", "ic", "up", ...)
// to the bytes that make the terminal perform that action. The table is
// opaque data: the redisplay engine asks "do you have insert-character?" and
// "how many bytes does it cost?", never "are you an xterm?".
//
// Parameterized capabilities ("IC", "DC", "UP", "LE", "RI") carry a single
// `%d` placeholder that is replaced by the decimal repeat count. We do not
// try to reproduce terminfo's full `tparm` language — one integer is all a
// line editor ever passes.
//
// Presets:
//
//   xterm() — ANSI/VT100 sequences understood by every modern emulator.
//   dumb()  — carriage return, newline, backspace, bell. Nothing clever,
//             which forces the redisplay engine onto its overprint paths.

use std::collections::HashMap;
use std::io::{self, Write};

// ─── Cap ────────────────────────────────────────────────────────────────────

/// A named terminal capability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cap {
    /// `ce` — clear from the cursor to the end of the line.
    ClearEol,
    /// `cl` — clear the screen and home the cursor.
    ClearScreen,
    /// `cr` — move to column 0 of the current row.
    CarriageReturn,
    /// `do` — move down one row (scrolling at the bottom).
    Newline,
    /// `up` — move up one row.
    CursorUp,
    /// `le` — move left one column.
    CursorLeft,
    /// `nd` — move right one column without printing.
    CursorRight,
    /// `ic` — open one blank cell at the cursor, shifting the rest right.
    InsertChar,
    /// `IC` — open `n` blank cells.
    ParmInsertChar,
    /// `dc` — delete one cell at the cursor, shifting the rest left.
    DeleteChar,
    /// `DC` — delete `n` cells.
    ParmDeleteChar,
    /// `UP` — move up `n` rows.
    ParmUp,
    /// `LE` — move left `n` columns.
    ParmLeft,
    /// `RI` — move right `n` columns.
    ParmRight,
    /// `bl` — audible bell.
    Bell,
    /// `vb` — visible bell (screen flash).
    VisibleBell,
}

impl Cap {
    /// Every capability, in table order.
    pub const ALL: [Self; 16] = [
        Self::ClearEol,
        Self::ClearScreen,
        Self::CarriageReturn,
        Self::Newline,
        Self::CursorUp,
        Self::CursorLeft,
        Self::CursorRight,
        Self::InsertChar,
        Self::ParmInsertChar,
        Self::DeleteChar,
        Self::ParmDeleteChar,
        Self::ParmUp,
        Self::ParmLeft,
        Self::ParmRight,
        Self::Bell,
        Self::VisibleBell,
    ];

    /// The termcap-style short name of this capability.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::ClearEol => "ce",
            Self::ClearScreen => "cl",
            Self::CarriageReturn => "cr",
            Self::Newline => "do",
            Self::CursorUp => "up",
            Self::CursorLeft => "le",
            Self::CursorRight => "nd",
            Self::InsertChar => "ic",
            Self::ParmInsertChar => "IC",
            Self::DeleteChar => "dc",
            Self::ParmDeleteChar => "DC",
            Self::ParmUp => "UP",
            Self::ParmLeft => "LE",
            Self::ParmRight => "RI",
            Self::Bell => "bl",
            Self::VisibleBell => "vb",
        }
    }

    /// Look a capability up by its short name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|cap| cap.name() == name)
    }

    /// True if the sequence takes a `%d` repeat count.
    #[must_use]
    pub const fn is_parameterized(self) -> bool {
        matches!(
            self,
            Self::ParmInsertChar
                | Self::ParmDeleteChar
                | Self::ParmUp
                | Self::ParmLeft
                | Self::ParmRight
        )
    }

    /// The parameterized form of a single-shot capability, if one exists.
    #[must_use]
    pub const fn parameterized(self) -> Option<Self> {
        match self {
            Self::InsertChar => Some(Self::ParmInsertChar),
            Self::DeleteChar => Some(Self::ParmDeleteChar),
            Self::CursorUp => Some(Self::ParmUp),
            Self::CursorLeft => Some(Self::ParmLeft),
            Self::CursorRight => Some(Self::ParmRight),
            _ => None,
        }
    }
}

// ─── Capabilities ───────────────────────────────────────────────────────────

/// A table of terminal capabilities.
///
/// Missing entries mean "the terminal cannot do this"; callers fall back to
/// cruder strategies (overprinting, reprinting from column 0).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Capabilities {
    table: HashMap<Cap, Vec<u8>>,
}

impl Capabilities {
    /// An empty table: no capability is available.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// ANSI / VT100 sequences (xterm, kitty, alacritty, tmux, ...).
    #[must_use]
    pub fn xterm() -> Self {
        let mut caps = Self::empty();
        caps.set(Cap::ClearEol, b"\x1b[K");
        caps.set(Cap::ClearScreen, b"\x1b[H\x1b[2J");
        caps.set(Cap::CarriageReturn, b"\r");
        caps.set(Cap::Newline, b"\n");
        caps.set(Cap::CursorUp, b"\x1b[A");
        caps.set(Cap::CursorLeft, b"\x08");
        caps.set(Cap::CursorRight, b"\x1b[C");
        caps.set(Cap::InsertChar, b"\x1b[@");
        caps.set(Cap::ParmInsertChar, b"\x1b[%d@");
        caps.set(Cap::DeleteChar, b"\x1b[P");
        caps.set(Cap::ParmDeleteChar, b"\x1b[%dP");
        caps.set(Cap::ParmUp, b"\x1b[%dA");
        caps.set(Cap::ParmLeft, b"\x1b[%dD");
        caps.set(Cap::ParmRight, b"\x1b[%dC");
        caps.set(Cap::Bell, b"\x07");
        caps.set(Cap::VisibleBell, b"\x1b[?5h\x1b[?5l");
        caps
    }

    /// A glass teletype: carriage return, newline, backspace, bell.
    #[must_use]
    pub fn dumb() -> Self {
        let mut caps = Self::empty();
        caps.set(Cap::CarriageReturn, b"\r");
        caps.set(Cap::Newline, b"\n");
        caps.set(Cap::CursorLeft, b"\x08");
        caps.set(Cap::Bell, b"\x07");
        caps
    }

    /// Pick a preset from the `TERM` environment variable.
    ///
    /// `dumb`, `unknown`, and an unset `TERM` get [`dumb`](Self::dumb);
    /// everything else is assumed to speak ANSI.
    #[must_use]
    pub fn from_env() -> Self {
        match std::env::var("TERM") {
            Ok(term) if !term.is_empty() && term != "dumb" && term != "unknown" => Self::xterm(),
            _ => Self::dumb(),
        }
    }

    /// Set (or replace) the sequence for `cap`.
    pub fn set(&mut self, cap: Cap, seq: &[u8]) {
        self.table.insert(cap, seq.to_vec());
    }

    /// Remove `cap` from the table.
    pub fn remove(&mut self, cap: Cap) {
        self.table.remove(&cap);
    }

    /// The raw sequence for `cap`, `%d` placeholder included.
    #[must_use]
    pub fn get(&self, cap: Cap) -> Option<&[u8]> {
        self.table.get(&cap).map(Vec::as_slice)
    }

    /// The raw sequence for a capability given by short name.
    #[must_use]
    pub fn get_by_name(&self, name: &str) -> Option<&[u8]> {
        Cap::from_name(name).and_then(|cap| self.get(cap))
    }

    /// True if the terminal has `cap`.
    #[inline]
    #[must_use]
    pub fn has(&self, cap: Cap) -> bool {
        self.table.contains_key(&cap)
    }

    /// True if the terminal can open blank cells (`ic` or `IC`).
    #[must_use]
    pub fn can_insert(&self) -> bool {
        self.has(Cap::InsertChar) || self.has(Cap::ParmInsertChar)
    }

    /// True if the terminal can delete cells (`dc` or `DC`).
    #[must_use]
    pub fn can_delete(&self) -> bool {
        self.has(Cap::DeleteChar) || self.has(Cap::ParmDeleteChar)
    }

    /// Write the sequence for a non-parameterized `cap`.
    ///
    /// Returns `Ok(false)` (writing nothing) if the capability is missing.
    ///
    /// # Errors
    ///
    /// Propagates errors from the writer.
    pub fn write(&self, w: &mut impl Write, cap: Cap) -> io::Result<bool> {
        match self.get(cap) {
            Some(seq) => {
                w.write_all(seq)?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Write a parameterized `cap` with repeat count `n`.
    ///
    /// Returns `Ok(false)` if the capability is missing.
    ///
    /// # Errors
    ///
    /// Propagates errors from the writer.
    pub fn write_n(&self, w: &mut impl Write, cap: Cap, n: usize) -> io::Result<bool> {
        match self.get(cap) {
            Some(seq) => {
                w.write_all(&expand(seq, n))?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Bytes needed to emit `cap` (with count `n` for parameterized ones),
    /// or `None` if the terminal lacks it.
    #[must_use]
    pub fn cost(&self, cap: Cap, n: usize) -> Option<usize> {
        self.get(cap).map(|seq| {
            if cap.is_parameterized() {
                expand(seq, n).len()
            } else {
                seq.len()
            }
        })
    }
}

/// Substitute the first `%d` in `seq` with the decimal form of `n`.
fn expand(seq: &[u8], n: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(seq.len() + 4);
    let mut rest = seq;
    while let Some((&b, tail)) = rest.split_first() {
        if b == b'%' && tail.first() == Some(&b'd') {
            out.extend_from_slice(n.to_string().as_bytes());
            out.extend_from_slice(&tail[1..]);
            return out;
        }
        out.push(b);
        rest = tail;
    }
    out
}

// ─── Tests ───────────────────────────────────────────────────────────────────
