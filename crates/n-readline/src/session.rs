//! The editing session — one line editor bound to one terminal.
//!
//! A [`Session`] owns everything a line read touches: the line buffer,
//! history, keymaps, kill ring, options, the redisplay engine, and the
//! stack of suspended [`Context`]s. It is driven one byte at a time by
//! [`step`](Session::step); the two host entry points are thin loops around
//! that:
//!
//! - **Blocking** — [`read_line_blocking`](Session::read_line_blocking)
//!   pulls chunks from a [`ByteSource`] until a line is finished.
//! - **Driven** — [`install_handler`](Session::install_handler) registers a
//!   line handler, and the host hands over bytes as they arrive with
//!   [`drive_one_step`](Session::drive_one_step). Each finished line goes
//!   to the handler.
//!
//! Both modes feed the same state machine, so the same bytes produce the
//! same line, history, and kill ring no matter how they are chunked.
//!
//! # Input queues
//!
//! ```text
//!   replay  ── pushed-back keys, macro text ──┐
//!                                             ├─► next_byte ─► step
//!   input   ── bytes from the host ───────────┘
//! ```
//!
//! `replay` is always drained first. An abort empties `replay` but never
//! `input`: typed-ahead keys survive a cancelled sequence.

use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::io::Write;
use std::rc::Rc;
use std::time::Duration;

use n_term::caps::Capabilities;
use n_term::source::{ByteSource, ReadStatus};
use n_term::terminal::TerminalMode;
use tracing::{debug, trace};

use crate::buffer::LineBuffer;
use crate::command::{Builtin, Command, CommandRef, Outcome};
use crate::context::{Context, Mode, State};
use crate::display::Display;
use crate::error::{Error, Result};
use crate::history::{History, HistoryEntry};
use crate::keymap::{Binding, Keymaps, parse_keyseq};
use crate::killring::KillRing;
use crate::options::Options;
use crate::utf8::Utf8Decoder;

/// Columns assumed when the host does not say.
const DEFAULT_WIDTH: usize = 80;

// ---------------------------------------------------------------------------
// Line, Input
// ---------------------------------------------------------------------------

/// What a finished read produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    /// An accepted line, without the terminating newline.
    Text(String),
    /// End of input on an empty line.
    Eof,
}

impl Line {
    /// The accepted text, or `None` at end of input.
    #[must_use]
    pub fn text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            Self::Eof => None,
        }
    }

    /// True at end of input.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self, Self::Eof)
    }
}

/// One unit of input to the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Input {
    /// A raw byte.
    Byte(u8),
    /// The key sequence timeout expired with no further input.
    Timeout,
    /// The input source ended.
    Eof,
}

type Handler = Box<dyn FnMut(&mut Session, Line)>;

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A line editor.
pub struct Session {
    pub(crate) line: LineBuffer,
    pub(crate) history: History,
    pub(crate) keymaps: Keymaps,
    pub(crate) options: Options,
    pub(crate) kill_ring: KillRing,
    pub(crate) display: Display,
    out: Box<dyn Write>,
    term: Option<Box<dyn TerminalMode>>,

    pub(crate) contexts: Vec<Context>,
    pub(crate) replay: VecDeque<u8>,
    input: VecDeque<u8>,
    /// Persistent state bits. Mode bits come from `contexts`.
    pub(crate) flags: State,

    prompt: String,
    handler: Option<Handler>,
    in_handler: bool,
    /// The handler was removed or replaced while it was running.
    handler_changed: bool,

    pub(crate) utf8: Utf8Decoder,
    /// Repeat count captured on the first byte of a multi-byte character.
    pub(crate) utf8_count: i32,

    pub(crate) last_was_kill: bool,
    pub(crate) this_was_kill: bool,
    pub(crate) last_command: Option<Builtin>,
    pub(crate) explicit_arg: bool,
    /// Bytes in the key sequence being dispatched.
    pub(crate) key_seq_len: usize,

    pub(crate) macro_buf: Vec<u8>,
    pub(crate) last_macro: Option<Rc<[u8]>>,

    pub(crate) last_isearch: Option<String>,
    pub(crate) last_nsearch: Option<String>,
    pub(crate) noninc_pos: usize,
    /// The live line, stashed while browsing history.
    pub(crate) saved_line: Option<HistoryEntry>,

    pub(crate) done: Option<Line>,
    commands: HashMap<String, Rc<dyn Command>>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("line", &self.line.as_str())
            .field("point", &self.line.point())
            .field("mode", &self.mode())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Session {
    /// A session writing to `out`, with capabilities from `$TERM` and an
    /// 80-column screen.
    pub fn new(out: impl Write + 'static) -> Self {
        Self::with_terminal(out, Capabilities::from_env(), DEFAULT_WIDTH)
    }

    /// A session with an explicit capability table and screen width.
    pub fn with_terminal(out: impl Write + 'static, caps: Capabilities, width: usize) -> Self {
        let options = Options::default();
        let mut history = History::new();
        history.stifle(options.history_size);
        Self {
            line: LineBuffer::new(),
            history,
            keymaps: Keymaps::emacs(),
            options,
            kill_ring: KillRing::new(),
            display: Display::new(caps, width),
            out: Box::new(out),
            term: None,
            contexts: Vec::new(),
            replay: VecDeque::new(),
            input: VecDeque::new(),
            flags: State::empty(),
            prompt: String::new(),
            handler: None,
            in_handler: false,
            handler_changed: false,
            utf8: Utf8Decoder::new(),
            utf8_count: 1,
            last_was_kill: false,
            this_was_kill: false,
            last_command: None,
            explicit_arg: false,
            key_seq_len: 0,
            macro_buf: Vec::new(),
            last_macro: None,
            last_isearch: None,
            last_nsearch: None,
            noninc_pos: 0,
            saved_line: None,
            done: None,
            commands: HashMap::new(),
        }
    }

    /// Give the session a terminal to switch into raw mode while it reads.
    pub fn set_terminal_mode(&mut self, term: impl TerminalMode + 'static) {
        self.term = Some(Box::new(term));
    }

    // -- Blocking mode ------------------------------------------------------

    /// Read one line, pulling input from `source` until it is accepted or
    /// the source ends.
    ///
    /// Bytes read past the end of the line stay queued for the next call.
    ///
    /// # Errors
    ///
    /// [`Error::HandlerInstalled`] while a line handler is installed, and
    /// [`Error::Io`] if the source, the output, or the terminal fails.
    pub fn read_line_blocking(
        &mut self,
        prompt: &str,
        source: &mut dyn ByteSource,
    ) -> Result<Line> {
        if self.flags.contains(State::CALLBACK) {
            return Err(Error::HandlerInstalled);
        }
        prompt.clone_into(&mut self.prompt);
        self.prep_terminal()?;
        let line = self.blocking_loop(source);
        let restored = self.deprep_terminal();
        let line = line?;
        restored?;
        Ok(line)
    }

    fn blocking_loop(&mut self, source: &mut dyn ByteSource) -> Result<Line> {
        self.start_line()?;
        loop {
            if let Some(line) = self.process_queue() {
                self.flush()?;
                return Ok(line);
            }
            self.redisplay();
            self.flush()?;

            let input = match source.read_chunk(self.pending_timeout())? {
                ReadStatus::Bytes(bytes) => {
                    self.input.extend(bytes);
                    continue;
                }
                ReadStatus::TimedOut => Input::Timeout,
                ReadStatus::Eof => Input::Eof,
            };
            if let Some(line) = self.step(input) {
                self.flush()?;
                return Ok(line);
            }
        }
    }

    // -- Driven mode --------------------------------------------------------

    /// Install `handler` to receive finished lines, prep the terminal, and
    /// show `prompt`. Replaces any handler already installed.
    ///
    /// Called from inside the running handler, the new handler takes over
    /// when the current one returns.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the terminal or the output fails.
    pub fn install_handler(
        &mut self,
        prompt: &str,
        handler: impl FnMut(&mut Self, Line) + 'static,
    ) -> Result<()> {
        debug!(prompt, "install line handler");
        self.handler = Some(Box::new(handler));
        self.handler_changed = true;
        self.flags.insert(State::CALLBACK);
        prompt.clone_into(&mut self.prompt);
        if self.in_handler {
            return Ok(());
        }
        self.prep_terminal()?;
        self.start_line()
    }

    /// Remove the line handler and restore the terminal.
    ///
    /// # Errors
    ///
    /// [`Error::NoHandler`] if none is installed, [`Error::Io`] if the
    /// terminal fails.
    pub fn remove_handler(&mut self) -> Result<()> {
        if !self.flags.contains(State::CALLBACK) {
            return Err(Error::NoHandler);
        }
        debug!("remove line handler");
        self.handler = None;
        self.handler_changed = true;
        self.flags.remove(State::CALLBACK);
        self.deprep_terminal()
    }

    /// Feed bytes that just arrived. Every line they complete goes to the
    /// handler, then the screen is brought up to date.
    ///
    /// # Errors
    ///
    /// [`Error::NoHandler`] without a handler, [`Error::Io`] if the output
    /// or the terminal fails.
    pub fn drive_one_step(&mut self, bytes: &[u8]) -> Result<()> {
        if !self.flags.contains(State::CALLBACK) {
            return Err(Error::NoHandler);
        }
        self.input.extend(bytes);
        self.run_driven(None)
    }

    /// Tell the session the host's input ended.
    ///
    /// # Errors
    ///
    /// As for [`drive_one_step`](Self::drive_one_step).
    pub fn drive_eof(&mut self) -> Result<()> {
        if !self.flags.contains(State::CALLBACK) {
            return Err(Error::NoHandler);
        }
        self.run_driven(Some(Input::Eof))
    }

    /// Tell the session that [`pending_timeout`](Self::pending_timeout)
    /// elapsed with no input.
    ///
    /// # Errors
    ///
    /// As for [`drive_one_step`](Self::drive_one_step).
    pub fn drive_timeout(&mut self) -> Result<()> {
        if !self.flags.contains(State::CALLBACK) {
            return Err(Error::NoHandler);
        }
        self.run_driven(Some(Input::Timeout))
    }

    /// How long the host should wait for more input before calling
    /// [`drive_timeout`](Self::drive_timeout). `None` means wait forever.
    ///
    /// Only a pending key sequence whose prefix also means something on its
    /// own has a deadline.
    #[must_use]
    pub fn pending_timeout(&self) -> Option<Duration> {
        if !self.replay.is_empty() || !self.input.is_empty() {
            return None;
        }
        match self.contexts.last() {
            Some(Context::KeySequence(seq)) if !self.keymaps.fallback(seq.map).is_unbound() => {
                self.options.keyseq_timeout
            }
            _ => None,
        }
    }

    fn run_driven(&mut self, tail: Option<Input>) -> Result<()> {
        let mut tail = tail;
        while self.flags.contains(State::CALLBACK) {
            let line = match self.process_queue() {
                Some(line) => line,
                None => match tail.take().and_then(|input| self.step(input)) {
                    Some(line) => line,
                    None => break,
                },
            };
            self.deliver(line)?;
            if self.flags.contains(State::CALLBACK) {
                self.prep_terminal()?;
                self.start_line()?;
            }
        }
        if self.flags.contains(State::CALLBACK) {
            self.redisplay();
        }
        self.flush()
    }

    /// Hand a finished line to the handler with the terminal restored.
    fn deliver(&mut self, line: Line) -> Result<()> {
        self.flush()?;
        self.deprep_terminal()?;
        let Some(mut handler) = self.handler.take() else {
            return Ok(());
        };
        debug!(eof = line.is_eof(), "deliver line");
        self.in_handler = true;
        self.handler_changed = false;
        handler(self, line);
        self.in_handler = false;
        if !self.handler_changed {
            self.handler = Some(handler);
        }
        Ok(())
    }

    // -- The state machine --------------------------------------------------

    /// Run one unit of input through the state machine.
    ///
    /// Returns the line if this input finished it. Does not redisplay or
    /// flush; the host entry points do that.
    pub fn step(&mut self, input: Input) -> Option<Line> {
        let mode = self.mode();
        trace!(?input, %mode, "step");

        let outcome = match input {
            Input::Byte(key) => {
                if mode == Mode::TopLevel {
                    self.key_seq_len = 0;
                }
                self.key_seq_len += 1;
                self.step_byte(key)
            }
            Input::Timeout => self.step_timeout(),
            Input::Eof => self.step_eof(),
        };
        match outcome {
            Outcome::Done => {}
            Outcome::Bell => self.ding(),
            Outcome::Abort => self.abort(),
        }

        if self.contexts.is_empty() {
            self.explicit_arg = false;
        }
        self.done.take()
    }

    fn step_byte(&mut self, key: u8) -> Outcome {
        let root = self.keymaps.root();
        match self.contexts.last() {
            None => self.dispatch_in(root, key, 1),
            Some(Context::KeySequence(seq)) => {
                let (map, count) = (seq.map, seq.count);
                self.dispatch_in(map, key, count)
            }
            Some(Context::NumericArgument(_)) => self.arg_dispatch(key),
            Some(Context::IncrementalSearch(_)) => self.isearch_dispatch(key),
            Some(Context::NonIncrementalSearch(_)) => self.nsearch_dispatch(key),
            Some(Context::QuotedInsert { count }) => {
                let count = *count;
                self.contexts.pop();
                self.quoted_insert_byte(key, count)
            }
        }
    }

    fn step_eof(&mut self) -> Outcome {
        if matches!(self.contexts.last(), Some(Context::IncrementalSearch(_))) {
            self.isearch_finish_on_eof();
        }
        self.contexts.clear();
        if self.line.is_empty() {
            self.end_of_input();
            Outcome::Done
        } else {
            self.accept_line()
        }
    }

    /// Finish the read with [`Line::Eof`].
    pub(crate) fn end_of_input(&mut self) {
        debug!("end of input");
        self.redisplay();
        self.display.finish_line();
        self.flags.insert(State::DONE);
        self.done = Some(Line::Eof);
    }

    /// Feed queued bytes until a line completes or the queues run dry.
    fn process_queue(&mut self) -> Option<Line> {
        while let Some(key) = self.next_byte() {
            if let Some(line) = self.step(Input::Byte(key)) {
                return Some(line);
            }
        }
        None
    }

    fn next_byte(&mut self) -> Option<u8> {
        if let Some(key) = self.replay.pop_front() {
            if self.replay.is_empty() {
                self.flags.remove(State::MACRO_INPUT);
            }
            return Some(key);
        }
        let key = self.input.pop_front()?;
        if self.flags.contains(State::MACRO_DEF) {
            self.macro_buf.push(key);
        }
        Some(key)
    }

    /// True if more input is already queued.
    pub(crate) fn input_pending(&self) -> bool {
        !self.replay.is_empty() || !self.input.is_empty()
    }

    /// Make `key` the next byte read.
    pub(crate) fn push_back(&mut self, key: u8) {
        self.replay.push_front(key);
    }

    /// Queue `text` to be read before anything else, as macro input.
    pub(crate) fn inject(&mut self, text: &[u8]) {
        if text.is_empty() {
            return;
        }
        for &key in text.iter().rev() {
            self.replay.push_front(key);
        }
        self.flags.insert(State::MACRO_INPUT);
    }

    /// Cancel everything pending: contexts, replayed input, the numeric
    /// argument, a half-read character, and a macro being recorded.
    pub(crate) fn abort(&mut self) {
        debug!(contexts = self.contexts.len(), "abort");
        self.ding();
        self.contexts.clear();
        self.replay.clear();
        self.explicit_arg = false;
        self.utf8.reset();
        if self.flags.contains(State::MACRO_DEF) {
            self.flags.remove(State::MACRO_DEF);
            self.macro_buf.clear();
        }
        self.flags.remove(State::MACRO_INPUT);
    }

    /// Ring the bell in the configured style.
    pub fn ding(&mut self) {
        self.display.bell(self.options.bell_style);
    }

    // -- Line lifecycle -----------------------------------------------------

    fn start_line(&mut self) -> Result<()> {
        self.line.clear();
        self.history.reset_pos();
        self.saved_line = None;
        self.contexts.clear();
        self.explicit_arg = false;
        self.last_command = None;
        self.last_was_kill = false;
        self.utf8.reset();
        self.flags.remove(State::DONE);
        self.redisplay();
        self.flush()
    }

    fn prep_terminal(&mut self) -> Result<()> {
        if !self.flags.contains(State::TERM_PREPPED) {
            if let Some(term) = self.term.as_mut() {
                term.prep()?;
            }
            self.flags.insert(State::TERM_PREPPED);
        }
        Ok(())
    }

    fn deprep_terminal(&mut self) -> Result<()> {
        if self.flags.contains(State::TERM_PREPPED) {
            if let Some(term) = self.term.as_mut() {
                term.deprep()?;
            }
            self.flags.remove(State::TERM_PREPPED);
        }
        Ok(())
    }

    // -- Display ------------------------------------------------------------

    /// The prompt as currently shown. Searches and numeric arguments
    /// replace the host's prompt while they run.
    fn effective_prompt(&self) -> String {
        match self.contexts.last() {
            Some(Context::IncrementalSearch(search)) => search.prompt(),
            Some(Context::NonIncrementalSearch(search)) => search.prompt(&self.prompt),
            Some(Context::NumericArgument(arg)) => format!("(arg: {}) ", arg.count()),
            _ => self.prompt.clone(),
        }
    }

    pub(crate) fn redisplay(&mut self) {
        let prompt = self.effective_prompt();
        let (text, point) = match self.contexts.last() {
            Some(Context::NonIncrementalSearch(search)) => {
                (search.query.as_str(), search.query.point())
            }
            _ => (self.line.as_str(), self.line.point()),
        };
        self.display.redisplay(&prompt, text, point);
    }

    fn flush(&mut self) -> Result<()> {
        self.display.output().flush_to(&mut *self.out)?;
        Ok(())
    }

    /// Bring the screen up to date now.
    ///
    /// # Errors
    ///
    /// [`Error::Io`] if the output fails.
    pub fn refresh(&mut self) -> Result<()> {
        self.redisplay();
        self.flush()
    }

    /// The host printed something: the cursor is at the start of a fresh
    /// row and nothing of the line is on screen. The next refresh repaints
    /// the prompt and line there.
    pub fn on_new_line(&mut self) {
        self.display.on_new_line();
    }

    /// The screen is now `width` columns wide.
    pub fn set_screen_width(&mut self, width: usize) {
        self.display.set_width(width);
    }

    /// The host's prompt.
    #[must_use]
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Change the prompt. Takes effect at the next refresh.
    pub fn set_prompt(&mut self, prompt: &str) {
        prompt.clone_into(&mut self.prompt);
    }

    // -- Bindings -----------------------------------------------------------

    /// Bind a key sequence written in `\C-x`/`\M-a`/`\e` notation in the
    /// root keymap.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidKeySequence`] if `seq` does not parse or is empty.
    pub fn bind_keyseq(&mut self, seq: &str, binding: Binding) -> Result<()> {
        let bytes = parse_keyseq(seq)?;
        let root = self.keymaps.root();
        self.keymaps.bind_keyseq(root, &bytes, binding)
    }

    /// Bind a key sequence to a function by name: a built-in or a command
    /// added with [`add_command`](Self::add_command).
    ///
    /// # Errors
    ///
    /// [`Error::UnknownFunction`] for an unknown name, otherwise as
    /// [`bind_keyseq`](Self::bind_keyseq).
    pub fn bind_function(&mut self, seq: &str, name: &str) -> Result<()> {
        let command = self
            .function(name)
            .ok_or_else(|| Error::UnknownFunction(name.to_string()))?;
        self.bind_keyseq(seq, Binding::Command(command))
    }

    /// Bind a key sequence to macro text, itself in key sequence notation.
    ///
    /// # Errors
    ///
    /// As [`bind_keyseq`](Self::bind_keyseq), for either argument.
    pub fn bind_macro(&mut self, seq: &str, text: &str) -> Result<()> {
        let bytes = parse_keyseq(text)?;
        self.bind_keyseq(seq, Binding::macro_text(&bytes))
    }

    /// Register a host command under its name and bind `seq` to it.
    ///
    /// # Errors
    ///
    /// As [`bind_keyseq`](Self::bind_keyseq).
    pub fn bind_command(&mut self, seq: &str, command: impl Command + 'static) -> Result<()> {
        let command = self.add_command(command);
        self.bind_keyseq(seq, Binding::Command(command))
    }

    /// Register a host command so [`bind_function`](Self::bind_function)
    /// can find it by name.
    pub fn add_command(&mut self, command: impl Command + 'static) -> CommandRef {
        let command: Rc<dyn Command> = Rc::new(command);
        self.commands
            .insert(command.name().to_string(), Rc::clone(&command));
        CommandRef::Custom(command)
    }

    /// Look a function up by name. Built-ins win over host commands.
    #[must_use]
    pub fn function(&self, name: &str) -> Option<CommandRef> {
        Builtin::from_name(name).map(CommandRef::Builtin).or_else(|| {
            self.commands
                .get(name)
                .map(|c| CommandRef::Custom(Rc::clone(c)))
        })
    }

    /// The keymaps.
    #[must_use]
    pub const fn keymaps(&self) -> &Keymaps {
        &self.keymaps
    }

    /// The keymaps, for direct editing.
    pub const fn keymaps_mut(&mut self) -> &mut Keymaps {
        &mut self.keymaps
    }

    // -- Variables ----------------------------------------------------------

    /// The current variable values.
    #[must_use]
    pub const fn options(&self) -> &Options {
        &self.options
    }

    /// Set a variable by name, as `set name value` would.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownVariable`] or [`Error::InvalidValue`].
    pub fn set_variable(&mut self, name: &str, value: &str) -> Result<()> {
        self.options.set(name, value)?;
        self.sync_options();
        Ok(())
    }

    /// Apply one inputrc-style `set name value` line. Other lines are
    /// ignored.
    ///
    /// # Errors
    ///
    /// As [`set_variable`](Self::set_variable).
    pub fn apply_setting(&mut self, line: &str) -> Result<()> {
        self.options.apply(line)?;
        self.sync_options();
        Ok(())
    }

    fn sync_options(&mut self) {
        if self.history.limit() != self.options.history_size {
            self.history.stifle(self.options.history_size);
        }
    }

    // -- State --------------------------------------------------------------

    /// The history.
    #[must_use]
    pub const fn history(&self) -> &History {
        &self.history
    }

    /// The history, for adding or clearing entries.
    pub const fn history_mut(&mut self) -> &mut History {
        &mut self.history
    }

    /// The kill ring.
    #[must_use]
    pub const fn kill_ring(&self) -> &KillRing {
        &self.kill_ring
    }

    /// The line being edited.
    #[must_use]
    pub const fn buffer(&self) -> &LineBuffer {
        &self.line
    }

    /// The line being edited, for host commands.
    pub const fn buffer_mut(&mut self) -> &mut LineBuffer {
        &mut self.line
    }

    /// The line text.
    #[must_use]
    pub fn line(&self) -> &str {
        self.line.as_str()
    }

    /// Point, as a byte offset into the line.
    #[must_use]
    pub const fn point(&self) -> usize {
        self.line.point()
    }

    /// Mark, as a byte offset into the line.
    #[must_use]
    pub const fn mark(&self) -> usize {
        self.line.mark()
    }

    /// What the next byte will be taken as.
    #[must_use]
    pub fn mode(&self) -> Mode {
        self.contexts.last().map_or(Mode::TopLevel, Context::mode)
    }

    /// The full state bitfield: persistent flags plus a bit for every
    /// context on the stack.
    #[must_use]
    pub fn state(&self) -> State {
        self.contexts
            .iter()
            .fold(self.flags, |state, context| state | context.mode().flag())
    }
}

// ---------------------------------------------------------------------------
// Test support
// ---------------------------------------------------------------------------

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::io;
    use std::rc::Rc;

    use n_term::caps::Capabilities;

    use super::{Line, Session};

    /// A `Write` that appends into a shared vector.
    #[derive(Clone, Default)]
    pub struct Sink(pub Rc<RefCell<Vec<u8>>>);

    impl Sink {
        pub fn take(&self) -> Vec<u8> {
            std::mem::take(&mut *self.0.borrow_mut())
        }

        pub fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    impl io::Write for Sink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    /// An xterm session on a wide screen, with its output sink.
    pub fn session() -> (Session, Sink) {
        let sink = Sink::default();
        let session = Session::with_terminal(sink.clone(), Capabilities::xterm(), 200);
        (session, sink)
    }

    impl Session {
        /// Feed bytes straight into the state machine, starting a fresh
        /// line after each finished one. Returns the finished lines.
        pub fn feed(&mut self, bytes: &[u8]) -> Vec<Line> {
            self.input.extend(bytes);
            let mut lines = Vec::new();
            while let Some(line) = self.process_queue() {
                lines.push(line);
                self.reset_for_test();
            }
            self.redisplay();
            self.flush().expect("sink writes never fail");
            lines
        }

        /// Feed a string.
        pub fn feed_str(&mut self, s: &str) -> Vec<Line> {
            self.feed(s.as_bytes())
        }

        fn reset_for_test(&mut self) {
            self.start_line().expect("sink writes never fail");
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
