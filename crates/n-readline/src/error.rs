//! Error type for the host-facing API.
//!
//! Editing itself never fails: a command that has nothing to do rings the
//! bell and leaves the line alone. Errors only come from the edges, where a
//! host hands the engine a malformed binding or option, or where terminal
//! I/O breaks underneath it.

use std::io;

use thiserror::Error;

/// Everything a [`Session`](crate::Session) method can fail with.
#[derive(Debug, Error)]
pub enum Error {
    /// Reading input, writing output, or toggling the terminal failed.
    #[error("terminal I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A function name that no built-in or registered command answers to.
    #[error("unknown function `{0}`")]
    UnknownFunction(String),

    /// A key sequence in `\C-x`/`\M-a` notation that does not parse.
    #[error("invalid key sequence `{seq}`: {reason}")]
    InvalidKeySequence {
        /// The sequence as written.
        seq: String,
        /// What is wrong with it.
        reason: &'static str,
    },

    /// `set` named a variable the engine does not have.
    #[error("unknown variable `{0}`")]
    UnknownVariable(String),

    /// `set` gave a known variable a value it cannot take.
    #[error("invalid value `{value}` for variable `{name}`")]
    InvalidValue {
        /// The variable name.
        name: String,
        /// The rejected value.
        value: String,
    },

    /// A line handler is installed, so the call would interleave two reads.
    #[error("a line handler is already installed")]
    HandlerInstalled,

    /// The call needs an installed line handler and there is none.
    #[error("no line handler is installed")]
    NoHandler,
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
