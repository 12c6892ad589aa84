//! The built-in editing functions.
//!
//! Every [`Builtin`] runs here with the numeric argument and invoking key.
//! Most follow the same conventions:
//!
//! - A negative count runs the opposite function (`forward-char -3` is
//!   `backward-char 3`).
//! - "Nothing to do" is [`Outcome::Bell`]: deleting at the end of the line,
//!   moving past the oldest history entry, yanking from an empty ring.
//! - Commands that change the line in more than one step open an undo
//!   group, so a single `undo` takes the whole change back.
//!
//! History navigation keeps two stashes. The live line is saved in
//! `saved_line` when the user first steps into the history, and edits made
//! to a history entry are stored in that entry (text plus undo log) when
//! the user steps away from it.

use std::rc::Rc;

use tracing::debug;

use crate::command::{Builtin, Outcome};
use crate::context::{Context, State};
use crate::history::{Direction, HistoryEntry};
use crate::killring::KillDirection;
use crate::session::{Line, Session};
use crate::utf8::Decoded;
use crate::word;

/// What `*-word` case commands do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Case {
    Upper,
    Lower,
    Capitalize,
}

impl Session {
    /// Run built-in `b`.
    pub(crate) fn run_builtin(&mut self, b: Builtin, count: i32, key: u8) -> Outcome {
        use Builtin as B;

        match b {
            // Motion
            B::ForwardChar => self.forward_char(count),
            B::BackwardChar => self.forward_char(count.saturating_neg()),
            B::ForwardWord => self.forward_word(count),
            B::BackwardWord => self.forward_word(count.saturating_neg()),
            B::BeginningOfLine => {
                self.line.set_point(0);
                Outcome::Done
            }
            B::EndOfLine => {
                self.line.set_point(self.line.len());
                Outcome::Done
            }

            // Editing
            B::SelfInsert => self.self_insert(count, key),
            B::TabInsert => self.insert_repeated('\t', count),
            B::QuotedInsert => {
                self.contexts.push(Context::QuotedInsert { count });
                Outcome::Done
            }
            B::DeleteChar => self.delete_char(count),
            B::BackwardDeleteChar => self.backward_delete_char(count),
            B::TransposeChars => self.transpose_chars(count),
            B::TransposeWords => self.transpose_words(count),
            B::UpcaseWord => self.change_case(count, Case::Upper),
            B::DowncaseWord => self.change_case(count, Case::Lower),
            B::CapitalizeWord => self.change_case(count, Case::Capitalize),
            B::DeleteHorizontalSpace => {
                let run = word::blank_run(self.line.as_str(), self.line.point());
                let start = run.start;
                self.line.delete(run);
                self.line.set_point(start);
                Outcome::Done
            }

            // Killing and yanking
            B::KillLine => self.kill_line(count),
            B::BackwardKillLine => self.backward_kill_line(count),
            B::UnixLineDiscard => {
                let point = self.line.point();
                if point == 0 {
                    return Outcome::Bell;
                }
                self.kill_text(point, 0);
                Outcome::Done
            }
            B::KillWord => self.kill_word(count),
            B::BackwardKillWord => self.kill_word(count.saturating_neg()),
            B::UnixWordRubout => self.unix_word_rubout(count),
            B::Yank => self.yank(),
            B::YankPop => self.yank_pop(),

            // History
            B::PreviousHistory => self.previous_history(count),
            B::NextHistory => self.next_history(count),
            B::BeginningOfHistory => {
                let steps = i32::try_from(self.history.pos() + 1).unwrap_or(i32::MAX);
                self.previous_history(steps)
            }
            B::EndOfHistory => {
                self.maybe_replace_line();
                self.history.reset_pos();
                self.maybe_unsave_line()
            }
            B::ReverseSearchHistory => self.isearch_start(Direction::Reverse),
            B::ForwardSearchHistory => self.isearch_start(Direction::Forward),
            B::NonIncrementalReverseSearchHistory => self.nsearch_start(Direction::Reverse),
            B::NonIncrementalForwardSearchHistory => self.nsearch_start(Direction::Forward),
            B::NonIncrementalReverseSearchHistoryAgain => self.nsearch_again(Direction::Reverse),
            B::NonIncrementalForwardSearchHistoryAgain => self.nsearch_again(Direction::Forward),

            // Miscellaneous
            B::AcceptLine => self.accept_line(),
            B::Undo => self.undo(count),
            B::RevertLine => {
                if self.line.revert() {
                    Outcome::Done
                } else {
                    Outcome::Bell
                }
            }
            B::SetMark => {
                let pos = if self.explicit_arg {
                    usize::try_from(count).unwrap_or(0)
                } else {
                    self.line.point()
                };
                self.line.set_mark(pos);
                Outcome::Done
            }
            B::ExchangePointAndMark => {
                self.line.exchange_point_and_mark();
                Outcome::Done
            }
            B::UniversalArgument => self.universal_argument(count),
            B::DigitArgument => self.digit_argument(count, key),
            B::DoLowercaseVersion => Outcome::Bell,
            B::Abort => Outcome::Abort,
            B::ClearScreen => {
                if self.explicit_arg {
                    self.display.clear_visible();
                } else {
                    self.display.clear_screen();
                }
                Outcome::Done
            }
            B::RedrawCurrentLine => {
                self.display.clear_visible();
                Outcome::Done
            }
            B::StartKbdMacro => self.start_kbd_macro(),
            B::EndKbdMacro => self.end_kbd_macro(count),
            B::CallLastKbdMacro => self.call_last_kbd_macro(count),
            B::EndOfFile => {
                if self.line.is_empty() {
                    self.end_of_input();
                    Outcome::Done
                } else {
                    self.delete_char(count)
                }
            }
        }
    }

    // -- Motion -------------------------------------------------------------

    /// The offset `count` characters (grapheme clusters) from `pos`,
    /// backward for a negative count, clamped to the line.
    fn char_offset(&self, pos: usize, count: i32) -> usize {
        let mut pos = pos;
        for _ in 0..count.unsigned_abs() {
            let next = if count > 0 {
                self.line.next_boundary(pos)
            } else {
                self.line.prev_boundary(pos)
            };
            if next == pos {
                break;
            }
            pos = next;
        }
        pos
    }

    /// The offset `count` words from `pos`.
    fn word_offset(&self, pos: usize, count: i32) -> usize {
        let text = self.line.as_str();
        let mut pos = pos;
        for _ in 0..count.unsigned_abs() {
            let next = if count > 0 {
                word::forward_word(text, pos)
            } else {
                word::backward_word(text, pos)
            };
            if next == pos {
                break;
            }
            pos = next;
        }
        pos
    }

    fn forward_char(&mut self, count: i32) -> Outcome {
        let point = self.line.point();
        let target = self.char_offset(point, count);
        self.line.set_point(target);
        if target == point && count != 0 {
            Outcome::Bell
        } else {
            Outcome::Done
        }
    }

    fn forward_word(&mut self, count: i32) -> Outcome {
        let target = self.word_offset(self.line.point(), count);
        self.line.set_point(target);
        Outcome::Done
    }

    // -- Insertion ----------------------------------------------------------

    fn self_insert(&mut self, count: i32, key: u8) -> Outcome {
        if !self.utf8.is_pending() {
            self.utf8_count = count;
        }
        match self.utf8.push(key) {
            Decoded::Char(ch) => self.insert_repeated(ch, self.utf8_count),
            Decoded::Incomplete => Outcome::Done,
            Decoded::Invalid => Outcome::Bell,
            Decoded::Interrupted => {
                self.push_back(key);
                Outcome::Bell
            }
        }
    }

    /// Insert the byte after `quoted-insert`. A multi-byte character keeps
    /// the context alive until it is complete.
    pub(crate) fn quoted_insert_byte(&mut self, key: u8, count: i32) -> Outcome {
        match self.utf8.push(key) {
            Decoded::Char(ch) => self.insert_repeated(ch, count),
            Decoded::Incomplete => {
                self.contexts.push(Context::QuotedInsert { count });
                Outcome::Done
            }
            Decoded::Invalid => Outcome::Bell,
            Decoded::Interrupted => {
                self.push_back(key);
                Outcome::Bell
            }
        }
    }

    fn insert_repeated(&mut self, ch: char, count: i32) -> Outcome {
        let Ok(n) = usize::try_from(count) else {
            return Outcome::Done;
        };
        let text: String = std::iter::repeat_n(ch, n).collect();
        self.line.insert(&text);
        Outcome::Done
    }

    // -- Deletion -----------------------------------------------------------

    fn delete_char(&mut self, count: i32) -> Outcome {
        if count < 0 {
            return self.backward_delete_char(count.saturating_neg());
        }
        let point = self.line.point();
        if point == self.line.len() {
            return Outcome::Bell;
        }
        if count > 1 || self.explicit_arg {
            let end = self.char_offset(point, count);
            self.kill_text(point, end);
        } else {
            let end = self.line.next_boundary(point);
            self.line.delete(point..end);
        }
        Outcome::Done
    }

    fn backward_delete_char(&mut self, count: i32) -> Outcome {
        if count < 0 {
            return self.delete_char(count.saturating_neg());
        }
        let point = self.line.point();
        if point == 0 {
            return Outcome::Bell;
        }
        if count > 1 || self.explicit_arg {
            let start = self.char_offset(point, count.saturating_neg());
            self.kill_text(point, start);
        } else {
            let start = self.line.prev_boundary(point);
            self.line.delete(start..point);
        }
        Outcome::Done
    }

    // -- Transposition and case ---------------------------------------------

    fn transpose_chars(&mut self, count: i32) -> Outcome {
        if count == 0 {
            return Outcome::Done;
        }
        if self.line.is_empty() || self.line.point() == 0 {
            return Outcome::Bell;
        }
        let mut count = count;
        let mut end = self.line.point();
        if end == self.line.len() {
            end = self.line.prev_boundary(end);
            count = 1;
        }
        if end == 0 {
            return Outcome::Bell;
        }
        self.line.begin_group();
        self.line.set_point(end);
        let start = self.line.prev_boundary(end);
        let moved = self.line.delete(start..end);
        let target = self.char_offset(start, count);
        self.line.set_point(target);
        self.line.insert(&moved);
        self.line.end_group();
        Outcome::Done
    }

    fn transpose_words(&mut self, count: i32) -> Outcome {
        if count == 0 {
            return Outcome::Done;
        }
        let Ok(n) = usize::try_from(count) else {
            return Outcome::Bell;
        };
        let Some((w1, w2)) = word::transpose_targets(self.line.as_str(), self.line.point(), n)
        else {
            return Outcome::Bell;
        };
        let word1 = self.line.slice(w1.clone()).to_string();
        let word2 = self.line.slice(w2.clone()).to_string();

        // The second word goes first so the first word's offsets stay valid.
        self.line.begin_group();
        self.line.set_point(w2.start);
        self.line.delete(w2.clone());
        self.line.insert(&word1);
        self.line.set_point(w1.start);
        self.line.delete(w1);
        self.line.insert(&word2);
        self.line.set_point(w2.end);
        self.line.end_group();
        Outcome::Done
    }

    fn change_case(&mut self, count: i32, case: Case) -> Outcome {
        let point = self.line.point();
        let target = self.word_offset(point, count);
        let range = if count < 0 { target..point } else { point..target };
        if range.is_empty() {
            self.line.set_point(range.end);
            return Outcome::Done;
        }
        let original = self.line.slice(range.clone());
        let changed = convert_case(original, case);
        let start = range.start;
        if changed != original {
            self.line.replace(range, &changed);
        }
        self.line.set_point(start + changed.len());
        Outcome::Done
    }

    // -- Killing ------------------------------------------------------------

    /// Delete the text between `from` and `to` into the kill ring. Text
    /// after `from` appends to a continued kill, text before it prepends.
    pub(crate) fn kill_text(&mut self, from: usize, to: usize) {
        let (dir, range) = if from <= to {
            (KillDirection::Forward, from..to)
        } else {
            (KillDirection::Backward, to..from)
        };
        if !range.is_empty() {
            let text = self.line.delete(range);
            self.kill_ring.kill(&text, dir, self.last_was_kill);
        }
        self.this_was_kill = true;
    }

    fn kill_line(&mut self, count: i32) -> Outcome {
        if count < 0 {
            return self.backward_kill_line(1);
        }
        let point = self.line.point();
        let end = self.line.len();
        if point != end {
            self.kill_text(point, end);
        }
        Outcome::Done
    }

    fn backward_kill_line(&mut self, count: i32) -> Outcome {
        if count < 0 {
            return self.kill_line(1);
        }
        let point = self.line.point();
        if point == 0 {
            return Outcome::Bell;
        }
        self.kill_text(point, 0);
        Outcome::Done
    }

    fn kill_word(&mut self, count: i32) -> Outcome {
        let point = self.line.point();
        let target = self.word_offset(point, count);
        if target != point {
            self.kill_text(point, target);
        }
        Outcome::Done
    }

    fn unix_word_rubout(&mut self, count: i32) -> Outcome {
        let point = self.line.point();
        if point == 0 {
            return Outcome::Bell;
        }
        let start = (0..count.max(1)).fold(point, |pos, _| {
            word::unix_word_start(self.line.as_str(), pos)
        });
        self.kill_text(point, start);
        Outcome::Done
    }

    fn yank(&mut self) -> Outcome {
        let Some(text) = self.kill_ring.current().map(str::to_string) else {
            return Outcome::Bell;
        };
        self.line.set_mark(self.line.point());
        self.line.insert(&text);
        Outcome::Done
    }

    fn yank_pop(&mut self) -> Outcome {
        if !matches!(self.last_command, Some(Builtin::Yank | Builtin::YankPop)) {
            return Outcome::Bell;
        }
        let Some(current) = self.kill_ring.current().map(str::to_string) else {
            return Outcome::Bell;
        };
        let point = self.line.point();
        let Some(start) = point.checked_sub(current.len()) else {
            return Outcome::Bell;
        };
        if !self.line.as_str().is_char_boundary(start) || self.line.slice(start..point) != current {
            return Outcome::Bell;
        }
        let Some(next) = self.kill_ring.rotate().map(str::to_string) else {
            return Outcome::Bell;
        };
        self.line.begin_group();
        self.line.delete(start..point);
        self.line.set_mark(start);
        self.line.insert(&next);
        self.line.end_group();
        Outcome::Done
    }

    // -- History ------------------------------------------------------------

    /// Stash the live line before stepping into the history.
    fn maybe_save_line(&mut self) {
        if self.saved_line.is_none() {
            self.saved_line = Some(HistoryEntry {
                line: self.line.as_str().to_string(),
                data: Some(self.line.undo_log().clone()),
            });
        }
    }

    /// Store the edits made to the current history entry in that entry.
    pub(crate) fn maybe_replace_line(&mut self) {
        let pos = self.history.pos();
        let Some(entry) = self.history.get(pos) else {
            return;
        };
        let undo = self.line.undo_log();
        let changed = match &entry.data {
            Some(data) => data != undo,
            None => !undo.is_empty(),
        };
        if changed {
            let entry = HistoryEntry {
                line: self.line.as_str().to_string(),
                data: Some(undo.clone()),
            };
            self.history.replace_entry(pos, entry);
        }
    }

    /// Bring the stashed live line back.
    fn maybe_unsave_line(&mut self) -> Outcome {
        let Some(saved) = self.saved_line.take() else {
            return Outcome::Bell;
        };
        self.line.load(saved.line, saved.data.unwrap_or_default());
        Outcome::Done
    }

    fn load_history_entry(&mut self, index: usize) {
        if let Some(entry) = self.history.get(index) {
            let text = entry.line.clone();
            let undo = entry.data.clone().unwrap_or_default();
            self.line.load(text, undo);
        }
    }

    pub(crate) fn previous_history(&mut self, count: i32) -> Outcome {
        if count < 0 {
            return self.next_history(count.saturating_neg());
        }
        if count == 0 || self.history.is_empty() {
            return Outcome::Done;
        }
        let had_saved_line = self.saved_line.is_some();
        self.maybe_save_line();
        self.maybe_replace_line();

        let mut found = None;
        for _ in 0..count {
            if self.history.previous().is_none() {
                break;
            }
            found = Some(self.history.pos());
        }
        match found {
            Some(index) => {
                self.load_history_entry(index);
                Outcome::Done
            }
            None => {
                if !had_saved_line {
                    self.saved_line = None;
                }
                Outcome::Bell
            }
        }
    }

    pub(crate) fn next_history(&mut self, count: i32) -> Outcome {
        if count < 0 {
            return self.previous_history(count.saturating_neg());
        }
        if count == 0 {
            return Outcome::Done;
        }
        self.maybe_replace_line();

        let mut found = None;
        for _ in 0..count {
            if self.history.next().is_none() {
                found = None;
                break;
            }
            found = Some(self.history.pos());
        }
        match found {
            Some(index) => {
                self.load_history_entry(index);
                Outcome::Done
            }
            None => self.maybe_unsave_line(),
        }
    }

    // -- Accepting ----------------------------------------------------------

    pub(crate) fn accept_line(&mut self) -> Outcome {
        let text = self.line.as_str().to_string();
        self.maybe_replace_line();
        self.history.revert_edits();
        if self.options.auto_add_history
            && !text.is_empty()
            && self.history.last() != Some(text.as_str())
        {
            self.history.add(&text);
        }
        self.saved_line = None;
        debug!(len = text.len(), "accept line");

        self.redisplay();
        self.display.finish_line();
        self.flags.insert(State::DONE);
        self.done = Some(Line::Text(text));
        Outcome::Done
    }

    // -- Undo ---------------------------------------------------------------

    fn undo(&mut self, count: i32) -> Outcome {
        for _ in 0..count.max(0) {
            if !self.line.undo() {
                return Outcome::Bell;
            }
        }
        Outcome::Done
    }

    // -- Keyboard macros ----------------------------------------------------

    fn start_kbd_macro(&mut self) -> Outcome {
        if self.flags.contains(State::MACRO_DEF) {
            return Outcome::Abort;
        }
        match &self.last_macro {
            Some(text) if self.explicit_arg => {
                let text = Rc::clone(text);
                self.macro_buf = text.to_vec();
                self.inject(&text);
            }
            _ => self.macro_buf.clear(),
        }
        debug!("start keyboard macro");
        self.flags.insert(State::MACRO_DEF);
        Outcome::Done
    }

    fn end_kbd_macro(&mut self, count: i32) -> Outcome {
        if !self.flags.contains(State::MACRO_DEF) {
            return Outcome::Abort;
        }
        let keep = self.macro_buf.len().saturating_sub(self.key_seq_len);
        self.macro_buf.truncate(keep);
        self.flags.remove(State::MACRO_DEF);
        let text: Rc<[u8]> = Rc::from(std::mem::take(&mut self.macro_buf));
        debug!(len = text.len(), "end keyboard macro");
        self.last_macro = Some(text);
        self.call_last_kbd_macro(count.saturating_sub(1))
    }

    fn call_last_kbd_macro(&mut self, count: i32) -> Outcome {
        let Some(text) = self.last_macro.clone() else {
            return Outcome::Abort;
        };
        if self.flags.contains(State::MACRO_DEF) {
            let keep = self.macro_buf.len().saturating_sub(self.key_seq_len);
            self.macro_buf.truncate(keep);
            return Outcome::Bell;
        }
        for _ in 0..count.max(0) {
            self.inject(&text);
        }
        Outcome::Done
    }
}

/// Change the case of every word in `text`.
fn convert_case(text: &str, case: Case) -> String {
    let mut out = String::with_capacity(text.len());
    let mut in_word = false;
    for ch in text.chars() {
        if !ch.is_alphanumeric() {
            in_word = false;
            out.push(ch);
            continue;
        }
        let upper = match case {
            Case::Upper => true,
            Case::Lower => false,
            Case::Capitalize => !in_word,
        };
        in_word = true;
        if upper {
            out.extend(ch.to_uppercase());
        } else {
            out.extend(ch.to_lowercase());
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
