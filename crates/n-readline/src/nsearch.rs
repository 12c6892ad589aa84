//! Non-incremental history search (`M-p`, `M-n`).
//!
//! The query is typed into its own small buffer under a `:` prompt and
//! only searched for when it is submitted with RET. An empty query reuses
//! the previous one and continues from where it last matched. A match
//! replaces the line (undoably) with point at the start; a miss rings the
//! bell and leaves the line alone.

use tracing::debug;

use crate::buffer::LineBuffer;
use crate::command::Outcome;
use crate::context::Context;
use crate::history::Direction;
use crate::keymap::{DEL, ctrl};
use crate::session::Session;
use crate::utf8::{Decoded, is_continuation};
use crate::word;

/// A query being typed.
#[derive(Debug)]
pub struct NSearch {
    pub(crate) query: LineBuffer,
    direction: Direction,
    /// History position when the search started.
    save_line: usize,
}

impl NSearch {
    /// The search prompt: the last line of `base` followed by `:`.
    #[must_use]
    pub fn prompt(&self, base: &str) -> String {
        let last = base.rfind('\n').map_or(base, |i| &base[i + 1..]);
        format!("{last}:")
    }

    /// The query typed so far.
    #[must_use]
    pub fn query(&self) -> &str {
        self.query.as_str()
    }

    /// Which way the search will go.
    #[must_use]
    pub const fn direction(&self) -> Direction {
        self.direction
    }
}

impl Session {
    /// Start reading a query.
    pub(crate) fn nsearch_start(&mut self, direction: Direction) -> Outcome {
        debug!(?direction, "non-incremental search");
        let search = NSearch {
            query: LineBuffer::new(),
            direction,
            save_line: self.history.pos(),
        };
        self.contexts
            .push(Context::NonIncrementalSearch(Box::new(search)));
        Outcome::Done
    }

    /// Feed one key to the query being typed.
    pub(crate) fn nsearch_dispatch(&mut self, key: u8) -> Outcome {
        let Some(Context::NonIncrementalSearch(mut search)) = self.contexts.pop() else {
            return Outcome::Done;
        };
        if self.utf8.is_pending() && !is_continuation(key) {
            self.utf8.reset();
        }
        if matches!(key, b'\r' | b'\n') {
            return self.nsearch_submit(&search);
        }
        let query = &mut search.query;

        let outcome = match key {
            k if k == ctrl(b'c') || k == ctrl(b'g') => {
                self.utf8.reset();
                return Outcome::Bell;
            }
            k if k == ctrl(b'w') => {
                let point = query.point();
                let start = word::unix_word_start(query.as_str(), point);
                query.delete(start..point);
                Outcome::Done
            }
            k if k == ctrl(b'u') => {
                let point = query.point();
                query.delete(0..point);
                Outcome::Done
            }
            k if k == ctrl(b'h') || k == DEL => {
                let point = query.point();
                if point == 0 {
                    return Outcome::Done;
                }
                let start = query.prev_boundary(point);
                query.delete(start..point);
                Outcome::Done
            }
            _ => match self.utf8.push(key) {
                Decoded::Char(ch) => {
                    query.insert(ch.encode_utf8(&mut [0; 4]));
                    Outcome::Done
                }
                Decoded::Incomplete => Outcome::Done,
                Decoded::Invalid | Decoded::Interrupted => Outcome::Bell,
            },
        };
        self.contexts.push(Context::NonIncrementalSearch(search));
        outcome
    }

    fn nsearch_submit(&mut self, search: &NSearch) -> Outcome {
        let query = search.query.as_str();
        if query.is_empty() {
            if self.last_nsearch.is_none() {
                return Outcome::Bell;
            }
        } else {
            self.noninc_pos = search.save_line;
            self.last_nsearch = Some(query.to_string());
        }
        self.nsearch_again(search.direction)
    }

    /// Search again for the last submitted query.
    pub(crate) fn nsearch_again(&mut self, direction: Direction) -> Outcome {
        let Some(query) = self.last_nsearch.clone() else {
            return Outcome::Bell;
        };
        let Some(from) = self
            .noninc_pos
            .checked_add_signed(direction.step())
            .filter(|&from| from <= self.history.len())
        else {
            return Outcome::Bell;
        };
        let Some((index, _)) = self.history.search(&query, from, direction) else {
            debug!(%query, "non-incremental search failed");
            return Outcome::Bell;
        };
        let Some(entry) = self.history.get(index) else {
            return Outcome::Bell;
        };

        let text = entry.line.clone();
        self.noninc_pos = index;
        let len = self.line.len();
        self.line.replace(0..len, &text);
        self.line.set_point(0);
        self.line.set_mark(text.len());
        self.saved_line = None;
        Outcome::Done
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::context::Mode;
    use crate::session::testing::{Sink, session};

    fn searchable(lines: &[&str]) -> (Session, Sink) {
        let (mut s, sink) = session();
        for line in lines {
            s.history_mut().add(line);
        }
        s.history_mut().reset_pos();
        (s, sink)
    }

    #[test]
    fn prompt_uses_last_prompt_line() {
        let search = NSearch {
            query: LineBuffer::new(),
            direction: Direction::Reverse,
            save_line: 0,
        };
        assert_eq!(search.prompt("status\n> "), "> :");
        assert_eq!(search.prompt(""), ":");
    }

    #[test]
    fn submit_finds_older_entry() {
        let (mut s, _) = searchable(&["foo bar", "foo baz", "qux"]);
        s.set_prompt("$ ");
        s.feed(b"\x1bpfo");
        assert_eq!(s.mode(), Mode::NonIncrementalSearch);
        assert_eq!(s.line(), "");
        assert_eq!(s.display.row_text(0), "$ :fo");

        s.feed(b"o\r");
        assert_eq!(s.mode(), Mode::TopLevel);
        assert_eq!(s.line(), "foo baz");
        assert_eq!(s.point(), 0);
        assert_eq!(s.mark(), 7);
    }

    #[test]
    fn empty_query_repeats_from_last_match() {
        let (mut s, sink) = searchable(&["foo bar", "foo baz", "qux"]);
        s.feed(b"\x1bpfoo\r");
        s.feed(b"\x1bp\r");
        assert_eq!(s.line(), "foo bar");
        sink.take();
        s.feed(b"\x1bp\r");
        assert_eq!(s.line(), "foo bar");
        assert!(sink.text().contains('\x07'));
    }

    #[test]
    fn empty_query_without_history_of_queries_rings() {
        let (mut s, sink) = searchable(&["foo"]);
        sink.take();
        s.feed(b"\x1bp\r");
        assert_eq!(s.mode(), Mode::TopLevel);
        assert!(sink.text().contains('\x07'));
    }

    #[test]
    fn miss_leaves_line_alone() {
        let (mut s, sink) = searchable(&["foo"]);
        s.feed(b"draft\x1bpzzz");
        sink.take();
        s.feed(b"\r");
        assert_eq!(s.line(), "draft");
        assert_eq!(s.point(), 5);
        assert!(sink.text().contains('\x07'));
    }

    #[test]
    fn again_commands() {
        let (mut s, sink) = searchable(&["foo bar", "foo baz", "qux"]);
        s.bind_function("\\C-o", "non-incremental-reverse-search-history-again")
            .unwrap();
        sink.take();
        s.feed(b"\x0f");
        assert!(sink.text().contains('\x07'));

        s.feed(b"\x1bpfoo\r");
        assert_eq!(s.line(), "foo baz");
        s.feed(b"\x0f");
        assert_eq!(s.line(), "foo bar");
        sink.take();
        s.feed(b"\x0f");
        assert_eq!(s.line(), "foo bar");
        assert!(sink.text().contains('\x07'));
    }

    #[test]
    fn forward_from_old_entry() {
        let (mut s, _) = searchable(&["foo bar", "foo baz", "qux"]);
        s.feed(b"\x1b<");
        s.feed(b"\x1bnbaz\r");
        assert_eq!(s.line(), "foo baz");
    }

    #[test]
    fn anchored_query() {
        let (mut s, _) = searchable(&["make test", "cargo make"]);
        s.feed(b"\x1bp^make\r");
        assert_eq!(s.line(), "make test");
    }

    #[test]
    fn query_editing_keys() {
        let (mut s, _) = searchable(&["foo bar", "qux"]);
        s.feed(b"\x1bpfox\x7fo\r");
        assert_eq!(s.line(), "foo bar");

        s.feed(b"\x1bpabc def\x17\x15qux\r");
        assert_eq!(s.line(), "qux");
    }

    #[test]
    fn rubout_on_empty_query_cancels_quietly() {
        let (mut s, sink) = searchable(&["foo"]);
        s.feed(b"ab\x1bp");
        sink.take();
        s.feed(b"\x7f");
        assert_eq!(s.mode(), Mode::TopLevel);
        assert_eq!(s.line(), "ab");
        assert!(!sink.text().contains('\x07'));
    }

    #[test]
    fn ctrl_g_cancels_with_bell() {
        let (mut s, sink) = searchable(&["foo"]);
        s.feed(b"ab\x1bpfo");
        sink.take();
        s.feed(b"\x07");
        assert_eq!(s.mode(), Mode::TopLevel);
        assert_eq!(s.line(), "ab");
        assert!(sink.text().contains('\x07'));
    }

    #[test]
    fn found_line_replacement_undoes() {
        let (mut s, _) = searchable(&["qux"]);
        s.feed(b"draft\x1bpqux\r");
        assert_eq!(s.line(), "qux");
        s.feed(b"\x1f");
        assert_eq!(s.line(), "draft");
    }
}
