//! Execution contexts — where a suspended command picks up again.
//!
//! Input arrives one byte at a time, and several commands need more than
//! one byte to finish: a multi-key sequence, a numeric argument, a search
//! query. Instead of blocking, each of them pushes a [`Context`] onto the
//! session's stack and returns. The next byte goes to whatever context is
//! on top. When the stack is empty the session is at top level and bytes
//! are dispatched through the root keymap.
//!
//! | Context | Mode | Ends when |
//! |---------|------|-----------|
//! | none | `TopLevel` | — |
//! | `KeySequence` | `KeySequence` | the sequence reaches a command or fails |
//! | `NumericArgument` | `NumericArgument` | a key that is not part of the argument arrives |
//! | `IncrementalSearch` | `IncrementalSearch` | a terminator, another command key, or C-g |
//! | `NonIncrementalSearch` | `NonIncrementalSearch` | RET submits the query, C-g cancels |
//! | `QuotedInsert` | `QuotedInsert` | the next byte (inserted literally) |

use std::fmt;

use crate::isearch::ISearch;
use crate::keymap::KeymapId;
use crate::nsearch::NSearch;

// ---------------------------------------------------------------------------
// Contexts
// ---------------------------------------------------------------------------

/// A partly typed key sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySeq {
    /// The map the next key is looked up in.
    pub map: KeymapId,
    /// The map that holds `key`.
    pub parent: KeymapId,
    /// The prefix key that led from `parent` into `map`.
    pub key: u8,
    /// The numeric argument the finished command will get.
    pub count: i32,
}

/// A numeric argument being typed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericArg {
    /// Magnitude so far.
    pub value: i32,
    /// `1` or `-1`.
    pub sign: i32,
    /// A digit has been typed.
    pub saw_digit: bool,
    /// A leading `-` has been typed.
    pub saw_minus: bool,
    /// The value came from typed digits (or `-`) rather than the default.
    pub explicit: bool,
    /// The argument is finished; the next key runs with it.
    pub read_one: bool,
}

impl NumericArg {
    /// The largest magnitude an argument may reach.
    pub const MAX: i32 = 1_000_000;

    /// A fresh argument starting from `count`.
    #[must_use]
    pub const fn new(count: i32, explicit: bool) -> Self {
        Self {
            value: count.saturating_abs(),
            sign: if count < 0 { -1 } else { 1 },
            saw_digit: false,
            saw_minus: false,
            explicit,
            read_one: false,
        }
    }

    /// The signed value.
    #[must_use]
    pub const fn count(&self) -> i32 {
        self.sign * self.value
    }
}

/// One suspended computation.
#[derive(Debug)]
pub enum Context {
    /// Waiting for the next key of a multi-key sequence.
    KeySequence(KeySeq),
    /// Accumulating a numeric argument.
    NumericArgument(NumericArg),
    /// Incremental history search.
    IncrementalSearch(Box<ISearch>),
    /// Reading a query for a non-incremental history search.
    NonIncrementalSearch(Box<NSearch>),
    /// The next byte is inserted literally, `count` times.
    QuotedInsert {
        /// Repeat count.
        count: i32,
    },
}

impl Context {
    /// The mode this context puts the session in.
    #[must_use]
    pub const fn mode(&self) -> Mode {
        match self {
            Self::KeySequence(_) => Mode::KeySequence,
            Self::NumericArgument(_) => Mode::NumericArgument,
            Self::IncrementalSearch(_) => Mode::IncrementalSearch,
            Self::NonIncrementalSearch(_) => Mode::NonIncrementalSearch,
            Self::QuotedInsert { .. } => Mode::QuotedInsert,
        }
    }
}

// ---------------------------------------------------------------------------
// Mode
// ---------------------------------------------------------------------------

/// What the next input byte will be taken as.
///
/// Derived from the top of the context stack; it is never stored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Ordinary dispatch through the root keymap.
    #[default]
    TopLevel,
    /// Typing a numeric argument.
    NumericArgument,
    /// Inside a multi-key sequence.
    KeySequence,
    /// Typing an incremental search query.
    IncrementalSearch,
    /// Typing a non-incremental search query.
    NonIncrementalSearch,
    /// The next byte is inserted as is.
    QuotedInsert,
}

impl Mode {
    /// Human-readable name, used in logs.
    #[must_use]
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::TopLevel => "top-level",
            Self::NumericArgument => "numeric-argument",
            Self::KeySequence => "key-sequence",
            Self::IncrementalSearch => "incremental-search",
            Self::NonIncrementalSearch => "non-incremental-search",
            Self::QuotedInsert => "quoted-insert",
        }
    }

    /// True for the two search modes.
    #[inline]
    #[must_use]
    pub const fn is_search(self) -> bool {
        matches!(self, Self::IncrementalSearch | Self::NonIncrementalSearch)
    }

    /// The state flag for this mode (empty at top level).
    #[must_use]
    pub const fn flag(self) -> State {
        match self {
            Self::TopLevel => State::empty(),
            Self::NumericArgument => State::NUMERIC_ARG,
            Self::KeySequence => State::KEY_SEQUENCE,
            Self::IncrementalSearch => State::ISEARCH,
            Self::NonIncrementalSearch => State::NSEARCH,
            Self::QuotedInsert => State::QUOTED_INSERT,
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ---------------------------------------------------------------------------
// State
// ---------------------------------------------------------------------------

bitflags::bitflags! {
    /// Session state as a bitfield.
    ///
    /// The mode bits mirror the context stack (any context on the stack
    /// sets its bit, not only the top one). The rest are kept by the
    /// session itself.
    ///
    /// ```
    /// use n_readline::State;
    ///
    /// let s = State::KEY_SEQUENCE | State::CALLBACK;
    /// assert!(s.contains(State::CALLBACK));
    /// assert!(!s.contains(State::DONE));
    /// ```
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct State: u16 {
        /// A numeric argument is being typed.
        const NUMERIC_ARG   = 1 << 0;
        /// A multi-key sequence is pending.
        const KEY_SEQUENCE  = 1 << 1;
        /// Incremental search is active.
        const ISEARCH       = 1 << 2;
        /// Non-incremental search is reading its query.
        const NSEARCH       = 1 << 3;
        /// The next byte is inserted literally.
        const QUOTED_INSERT = 1 << 4;
        /// A keyboard macro is being recorded.
        const MACRO_DEF     = 1 << 5;
        /// Replayed macro text is being read.
        const MACRO_INPUT   = 1 << 6;
        /// A line handler is installed (driven mode).
        const CALLBACK      = 1 << 7;
        /// A finished line is waiting to be handed over.
        const DONE          = 1 << 8;
        /// The terminal is in raw mode.
        const TERM_PREPPED  = 1 << 9;
    }
}

impl State {
    /// The bits derived from the context stack.
    pub const MODES: Self = Self::NUMERIC_ARG
        .union(Self::KEY_SEQUENCE)
        .union(Self::ISEARCH)
        .union(Self::NSEARCH)
        .union(Self::QUOTED_INSERT);
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn default_mode_is_top_level() {
        assert_eq!(Mode::default(), Mode::TopLevel);
        assert_eq!(Mode::TopLevel.flag(), State::empty());
    }

    #[test]
    fn mode_names() {
        assert_eq!(Mode::IncrementalSearch.to_string(), "incremental-search");
        assert_eq!(format!("{}", Mode::QuotedInsert), "quoted-insert");
    }

    #[test]
    fn search_modes() {
        assert!(Mode::IncrementalSearch.is_search());
        assert!(Mode::NonIncrementalSearch.is_search());
        assert!(!Mode::KeySequence.is_search());
    }

    #[test]
    fn mode_flags_are_mode_bits() {
        for mode in [
            Mode::NumericArgument,
            Mode::KeySequence,
            Mode::IncrementalSearch,
            Mode::NonIncrementalSearch,
            Mode::QuotedInsert,
        ] {
            assert!(State::MODES.contains(mode.flag()), "{mode}");
        }
        assert!(!State::MODES.contains(State::CALLBACK));
    }

    #[test]
    fn numeric_arg_from_count() {
        let arg = NumericArg::new(-4, true);
        assert_eq!(arg.value, 4);
        assert_eq!(arg.sign, -1);
        assert_eq!(arg.count(), -4);
        assert!(arg.explicit);
        assert_eq!(NumericArg::new(1, false).count(), 1);
    }

    #[test]
    fn context_modes() {
        assert_eq!(Context::QuotedInsert { count: 1 }.mode(), Mode::QuotedInsert);
        let seq = Context::KeySequence(KeySeq {
            map: crate::keymap::Keymaps::new().root(),
            parent: crate::keymap::Keymaps::new().root(),
            key: b'a',
            count: 1,
        });
        assert_eq!(seq.mode(), Mode::KeySequence);
    }
}
