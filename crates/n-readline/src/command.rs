//! Commands — what a key binding runs.
//!
//! A key bound to a command runs it with two arguments: the numeric
//! argument (`count`, 1 when none was typed) and the key that invoked it.
//! The key matters: `self-insert` inserts it, `digit-argument` reads the
//! digit from it, and a command reached through a fallback sees the prefix
//! key of the sequence that failed.
//!
//! Built-in functions are the [`Builtin`] enum and are executed by the
//! session itself. Hosts add their own behaviour by implementing
//! [`Command`] and binding it with
//! [`Session::bind_command`](crate::Session::bind_command).
//!
//! # Outcomes
//!
//! | Outcome | Meaning |
//! |---------|---------|
//! | [`Outcome::Done`] | The command ran (possibly suspending for more input). |
//! | [`Outcome::Bell`] | Nothing to do. Ring the bell, keep all state. |
//! | [`Outcome::Abort`] | Unwind every pending context back to top level. |

use std::fmt;
use std::rc::Rc;

use crate::session::Session;

// ---------------------------------------------------------------------------
// Command trait
// ---------------------------------------------------------------------------

/// How a command finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Ran normally.
    Done,
    /// Recoverable "nothing to do": ring the bell, change nothing else.
    Bell,
    /// Cancel: clear the context stack, replayed input, and numeric
    /// argument, then ring the bell.
    Abort,
}

/// A host-defined editing command.
///
/// Commands run to completion; they cannot suspend waiting for input. A
/// command that wants more keys should bind a keymap prefix instead.
pub trait Command {
    /// The function name used in diagnostics and logging.
    fn name(&self) -> &str;

    /// Run with the numeric argument and the invoking key.
    fn run(&self, session: &mut Session, count: i32, key: u8) -> Outcome;
}

/// A command a keymap slot can hold.
#[derive(Clone)]
pub enum CommandRef {
    /// One of the engine's own functions.
    Builtin(Builtin),
    /// A host command.
    Custom(Rc<dyn Command>),
}

impl CommandRef {
    /// The function name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Builtin(b) => b.name(),
            Self::Custom(c) => c.name(),
        }
    }

    /// True if this is the given built-in.
    #[must_use]
    pub fn is(&self, builtin: Builtin) -> bool {
        matches!(self, Self::Builtin(b) if *b == builtin)
    }
}

impl fmt::Debug for CommandRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Builtin(b) => write!(f, "Builtin({})", b.name()),
            Self::Custom(c) => write!(f, "Custom({})", c.name()),
        }
    }
}

impl PartialEq for CommandRef {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Builtin(a), Self::Builtin(b)) => a == b,
            (Self::Custom(a), Self::Custom(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<Builtin> for CommandRef {
    fn from(b: Builtin) -> Self {
        Self::Builtin(b)
    }
}

// ---------------------------------------------------------------------------
// Builtin
// ---------------------------------------------------------------------------

macro_rules! builtins {
    ($($variant:ident => $name:literal,)+) => {
        /// The engine's built-in functions.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Builtin {
            $(
                #[doc = concat!("`", $name, "`")]
                $variant,
            )+
        }

        impl Builtin {
            /// Every built-in, in declaration order.
            pub const ALL: &'static [Self] = &[$(Self::$variant,)+];

            /// The function name, as used in `bind_keyseq` and inputrc files.
            #[must_use]
            pub const fn name(self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }
        }
    };
}

builtins! {
    // Motion
    ForwardChar => "forward-char",
    BackwardChar => "backward-char",
    ForwardWord => "forward-word",
    BackwardWord => "backward-word",
    BeginningOfLine => "beginning-of-line",
    EndOfLine => "end-of-line",

    // Editing
    SelfInsert => "self-insert",
    TabInsert => "tab-insert",
    QuotedInsert => "quoted-insert",
    DeleteChar => "delete-char",
    BackwardDeleteChar => "backward-delete-char",
    TransposeChars => "transpose-chars",
    TransposeWords => "transpose-words",
    UpcaseWord => "upcase-word",
    DowncaseWord => "downcase-word",
    CapitalizeWord => "capitalize-word",
    DeleteHorizontalSpace => "delete-horizontal-space",

    // Killing and yanking
    KillLine => "kill-line",
    BackwardKillLine => "backward-kill-line",
    UnixLineDiscard => "unix-line-discard",
    KillWord => "kill-word",
    BackwardKillWord => "backward-kill-word",
    UnixWordRubout => "unix-word-rubout",
    Yank => "yank",
    YankPop => "yank-pop",

    // History
    PreviousHistory => "previous-history",
    NextHistory => "next-history",
    BeginningOfHistory => "beginning-of-history",
    EndOfHistory => "end-of-history",
    ReverseSearchHistory => "reverse-search-history",
    ForwardSearchHistory => "forward-search-history",
    NonIncrementalReverseSearchHistory => "non-incremental-reverse-search-history",
    NonIncrementalForwardSearchHistory => "non-incremental-forward-search-history",
    NonIncrementalReverseSearchHistoryAgain => "non-incremental-reverse-search-history-again",
    NonIncrementalForwardSearchHistoryAgain => "non-incremental-forward-search-history-again",

    // Miscellaneous
    AcceptLine => "accept-line",
    Undo => "undo",
    RevertLine => "revert-line",
    SetMark => "set-mark",
    ExchangePointAndMark => "exchange-point-and-mark",
    UniversalArgument => "universal-argument",
    DigitArgument => "digit-argument",
    DoLowercaseVersion => "do-lowercase-version",
    Abort => "abort",
    ClearScreen => "clear-screen",
    RedrawCurrentLine => "redraw-current-line",
    StartKbdMacro => "start-kbd-macro",
    EndKbdMacro => "end-kbd-macro",
    CallLastKbdMacro => "call-last-kbd-macro",
    EndOfFile => "end-of-file",
}

impl Builtin {
    /// Look a built-in up by function name.
    ///
    /// `delete-char-or-eof` is accepted as another name for `end-of-file`.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        if name == "delete-char-or-eof" {
            return Some(Self::EndOfFile);
        }
        Self::ALL.iter().copied().find(|b| b.name() == name)
    }

    /// True for the functions that build a numeric argument. They leave
    /// the "previous command" bookkeeping alone.
    #[must_use]
    pub const fn is_argument(self) -> bool {
        matches!(self, Self::UniversalArgument | Self::DigitArgument)
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    struct Nop;

    impl Command for Nop {
        fn name(&self) -> &str {
            "nop"
        }

        fn run(&self, _session: &mut Session, _count: i32, _key: u8) -> Outcome {
            Outcome::Done
        }
    }

    #[test]
    fn names_round_trip() {
        for &b in Builtin::ALL {
            assert_eq!(Builtin::from_name(b.name()), Some(b));
        }
    }

    #[test]
    fn unknown_name() {
        assert_eq!(Builtin::from_name("frobnicate"), None);
    }

    #[test]
    fn eof_alias() {
        assert_eq!(
            Builtin::from_name("delete-char-or-eof"),
            Some(Builtin::EndOfFile)
        );
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = Builtin::ALL.iter().map(|b| b.name()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Builtin::ALL.len());
    }

    #[test]
    fn argument_classification() {
        assert!(Builtin::DigitArgument.is_argument());
        assert!(Builtin::UniversalArgument.is_argument());
        assert!(!Builtin::Yank.is_argument());
    }

    #[test]
    fn command_ref_equality() {
        let a: Rc<dyn Command> = Rc::new(Nop);
        let r1 = CommandRef::Custom(Rc::clone(&a));
        let r2 = CommandRef::Custom(a);
        let r3 = CommandRef::Custom(Rc::new(Nop));
        assert_eq!(r1, r2);
        assert_ne!(r1, r3);
        assert_eq!(CommandRef::from(Builtin::Undo), CommandRef::Builtin(Builtin::Undo));
        assert_eq!(r1.name(), "nop");
        assert!(CommandRef::from(Builtin::Yank).is(Builtin::Yank));
    }
}
