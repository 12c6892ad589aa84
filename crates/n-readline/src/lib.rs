//! # n-readline — an embeddable line editor
//!
//! Emacs-style editing of a single input line on a character terminal:
//! key bindings, a kill ring, undo, history browsing and search, keyboard
//! macros, and incremental redisplay.
//!
//! The engine consumes input one byte at a time and never blocks in the
//! middle of a command. Anything that needs more input (a key sequence, a
//! numeric argument, a search query) suspends itself as a
//! [`Context`](context::Context) and resumes when the next byte arrives.
//! That makes the same engine usable two ways:
//!
//! - **Blocking** — [`Session::read_line_blocking`] reads until a line is
//!   accepted.
//! - **Driven** — the host owns the event loop, installs a handler with
//!   [`Session::install_handler`], and feeds bytes with
//!   [`Session::drive_one_step`] as they arrive.
//!
//! ## Modules
//!
//! - **[`buffer`]** — the line text, point, mark, and undo log
//! - **[`keymap`]** — keymaps, bindings, key sequence notation
//! - **[`session`]** — the editor itself and its two host modes
//! - **[`history`]** / **[`killring`]** — what survives between lines
//! - **[`display`]** — minimal-update redisplay
//! - **[`isearch`]** / **[`nsearch`]** — history search
//!
//! ```
//! use n_readline::{Line, Session};
//! use n_term::source::ScriptSource;
//!
//! let mut session = Session::new(Vec::new());
//! let mut input = ScriptSource::new();
//! input.push_chunk(b"hello wrold\x02\x02\x02\x14\r");
//! let line = session.read_line_blocking("> ", &mut input).unwrap();
//! assert_eq!(line, Line::Text("hello world".into()));
//! ```

pub mod buffer;
mod builtins;
pub mod command;
pub mod context;
mod dispatch;
pub mod display;
pub mod error;
pub mod history;
pub mod isearch;
pub mod keymap;
pub mod killring;
pub mod nsearch;
pub mod options;
pub mod session;
pub mod undo;
pub mod utf8;
pub mod word;

pub use buffer::LineBuffer;
pub use command::{Builtin, Command, CommandRef, Outcome};
pub use context::{Mode, State};
pub use error::{Error, Result};
pub use history::{Direction, History, HistoryEntry};
pub use keymap::{Binding, KeymapId, Keymaps};
pub use killring::KillRing;
pub use options::{BellStyle, Options};
pub use session::{Input, Line, Session};
