//! Incremental history search (`C-r`, `C-s`).
//!
//! The search works on a snapshot of the history taken when it starts,
//! with the live line appended as the newest entry. Every key typed
//! extends the query and moves to the next match from where the last one
//! was found; the match is shown in the line buffer, but the history
//! position only moves when the search ends.
//!
//! | Key | Effect |
//! |-----|--------|
//! | printable | append to the query and search again |
//! | `C-r` / `C-s` | next match in that direction (or reuse the last query) |
//! | rubout | drop the last query character |
//! | `C-w` | append the word after the match |
//! | `C-y` | append the rest of the matched line |
//! | `C-g` | restore the original line and stop |
//! | a terminator (`ESC`, `C-j`) | accept the match and stop |
//! | any other control key | accept the match, then run the key |

use tracing::{debug, trace};

use crate::command::{Builtin, Outcome};
use crate::context::Context;
use crate::history::Direction;
use crate::keymap::{DEL, ESC, ctrl};
use crate::session::Session;
use crate::utf8::{Decoded, is_continuation};

// ---------------------------------------------------------------------------
// Search state
// ---------------------------------------------------------------------------

/// A running incremental search.
#[derive(Debug)]
pub struct ISearch {
    query: String,
    direction: Direction,
    /// History texts when the search started, live line last.
    lines: Vec<String>,
    /// Index of the line that was current when the search started.
    save_line: usize,
    /// Index of the line being searched.
    history_pos: usize,
    /// Where in `lines[history_pos]` the next comparison happens. Goes to
    /// -1 when a reverse search steps off the start of a line.
    sline_index: isize,
    last_found_line: usize,
    prev_line_found: Option<usize>,
    save_point: usize,
    save_mark: usize,
    failed: bool,
}

impl ISearch {
    /// The prompt shown while the search runs, e.g.
    /// ``(reverse-i-search)`foo': ``.
    #[must_use]
    pub fn prompt(&self) -> String {
        let failed = if self.failed { "failed " } else { "" };
        let reverse = match self.direction {
            Direction::Reverse => "reverse-",
            Direction::Forward => "",
        };
        format!("({failed}{reverse}i-search)`{}': ", self.query)
    }

    /// The query typed so far.
    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    fn current_len(&self) -> isize {
        signed(self.lines[self.history_pos].len())
    }

    /// Find the query at or after the current position, moving through
    /// the lines in the search direction. Returns `false` if there are no
    /// more matches; the position then falls back to the last match.
    fn advance(&mut self) -> bool {
        let reverse = self.direction == Direction::Reverse;
        let step = self.direction.step();
        let qlen = signed(self.query.len());

        let found = loop {
            let line = &self.lines[self.history_pos];
            let limit = signed(line.len()) - qlen + 1;
            let in_line = |index: isize| if reverse { index >= 0 } else { index < limit };
            let mut hit = false;
            while in_line(self.sline_index) {
                if matches_at(line, self.sline_index, &self.query) {
                    hit = true;
                    break;
                }
                self.sline_index += step;
                if self.sline_index < 0 {
                    self.sline_index = 0;
                    break;
                }
            }
            if hit {
                break true;
            }

            // Next line, skipping repeats of the last match and lines too
            // short to hold the query.
            let moved = loop {
                let Some(next) = self
                    .history_pos
                    .checked_add_signed(step)
                    .filter(|&next| next < self.lines.len())
                else {
                    break false;
                };
                self.history_pos = next;
                let candidate = &self.lines[next];
                let repeat = self
                    .prev_line_found
                    .is_some_and(|prev| self.lines[prev] == *candidate);
                if !repeat && candidate.len() >= self.query.len() {
                    break true;
                }
            };
            if !moved {
                break false;
            }
            self.sline_index = if reverse { self.current_len() - qlen } else { 0 };
        };

        if found {
            self.prev_line_found = Some(self.history_pos);
            self.last_found_line = self.history_pos;
        } else {
            self.history_pos = self.last_found_line;
            self.sline_index = self.sline_index.max(0);
        }
        self.failed = !found;
        found
    }
}

fn signed(n: usize) -> isize {
    isize::try_from(n).unwrap_or(isize::MAX)
}

fn matches_at(line: &str, index: isize, query: &str) -> bool {
    usize::try_from(index)
        .ok()
        .and_then(|i| line.get(i..))
        .is_some_and(|rest| rest.starts_with(query))
}

/// What a key does inside the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Op {
    Literal,
    Repeat,
    Flip,
    Rubout,
    Abort,
    YankWord,
    YankLine,
    /// An isearch terminator: stop without running the key.
    Terminate,
    /// Stop, then run the key as a command.
    Exit,
}

// ---------------------------------------------------------------------------
// Session integration
// ---------------------------------------------------------------------------

impl Session {
    /// Start an incremental search.
    pub(crate) fn isearch_start(&mut self, direction: Direction) -> Outcome {
        self.maybe_replace_line();
        let live = self
            .saved_line
            .as_ref()
            .map_or_else(|| self.line.as_str().to_string(), |entry| entry.line.clone());
        let mut lines: Vec<String> = self
            .history
            .entries()
            .iter()
            .map(|entry| entry.line.clone())
            .collect();
        lines.push(live);

        let save_line = self.history.pos().min(lines.len() - 1);
        let point = self.line.point();
        debug!(?direction, save_line, "incremental search");
        let search = ISearch {
            query: String::new(),
            direction,
            lines,
            save_line,
            history_pos: save_line,
            sline_index: signed(point),
            last_found_line: save_line,
            prev_line_found: None,
            save_point: point,
            save_mark: self.line.mark(),
            failed: false,
        };
        self.contexts
            .push(Context::IncrementalSearch(Box::new(search)));
        Outcome::Done
    }

    fn isearch_op(&self, search: &ISearch, key: u8) -> Op {
        if self.utf8.is_pending() && is_continuation(key) {
            return Op::Literal;
        }
        let root = self.keymaps.root();
        let mut bound = self.keymaps.get(root, key).as_builtin();
        if bound == Some(Builtin::DoLowercaseVersion) {
            bound = self
                .keymaps
                .get(root, key.to_ascii_lowercase())
                .as_builtin();
        }
        let reverse = search.direction == Direction::Reverse;

        match bound {
            Some(Builtin::ReverseSearchHistory) if reverse => Op::Repeat,
            Some(Builtin::ReverseSearchHistory) => Op::Flip,
            Some(Builtin::ForwardSearchHistory) if reverse => Op::Flip,
            Some(Builtin::ForwardSearchHistory) => Op::Repeat,
            Some(Builtin::BackwardDeleteChar) => Op::Rubout,
            _ if key == ctrl(b'g') || bound == Some(Builtin::Abort) => Op::Abort,
            _ if key == ctrl(b'w') || bound == Some(Builtin::UnixWordRubout) => Op::YankWord,
            _ if key == ctrl(b'y') || bound == Some(Builtin::Yank) => Op::YankLine,
            _ if self.options.isearch_terminators.contains(&key) => Op::Terminate,
            _ if key < 0x20 || key == DEL => Op::Exit,
            _ => Op::Literal,
        }
    }

    /// Feed one key to the incremental search on top of the stack.
    pub(crate) fn isearch_dispatch(&mut self, key: u8) -> Outcome {
        let Some(Context::IncrementalSearch(mut search)) = self.contexts.pop() else {
            return Outcome::Done;
        };
        let op = self.isearch_op(&search, key);
        trace!(?op, key, "isearch key");
        if op != Op::Literal && self.utf8.is_pending() {
            self.utf8.reset();
        }

        let mut outcome = Outcome::Done;
        let mut search_again = true;
        match op {
            Op::Abort => {
                self.isearch_abort(&search);
                return Outcome::Done;
            }
            Op::Terminate => {
                self.isearch_commit(&search);
                if key == ESC && self.input_pending() {
                    self.push_back(ESC);
                }
                return Outcome::Done;
            }
            Op::Exit => {
                self.isearch_commit(&search);
                self.push_back(key);
                return Outcome::Done;
            }
            Op::Literal => match self.utf8.push(key) {
                Decoded::Char(ch) => search.query.push(ch),
                Decoded::Incomplete => search_again = false,
                Decoded::Invalid => {
                    outcome = Outcome::Bell;
                    search_again = false;
                }
                Decoded::Interrupted => {
                    self.push_back(key);
                    outcome = Outcome::Bell;
                    search_again = false;
                }
            },
            Op::Repeat => {
                let reverse = search.direction == Direction::Reverse;
                if search.query.is_empty() {
                    match &self.last_isearch {
                        Some(last) => search.query.clone_from(last),
                        None => search_again = false,
                    }
                } else if reverse && search.sline_index >= 0 {
                    search.sline_index -= 1;
                } else if !reverse && search.sline_index != search.current_len() {
                    search.sline_index += 1;
                } else {
                    outcome = Outcome::Bell;
                }
            }
            Op::Flip => search.direction = search.direction.flip(),
            Op::Rubout => {
                if search.query.pop().is_none() {
                    outcome = Outcome::Bell;
                    search_again = false;
                }
            }
            Op::YankWord | Op::YankLine => {
                match self.isearch_yank(&search, op == Op::YankWord) {
                    Some(text) => search.query.push_str(&text),
                    None => {
                        outcome = Outcome::Bell;
                        search_again = false;
                    }
                }
            }
        }

        if search_again && !search.query.is_empty() {
            if search.advance() {
                let pos = search.history_pos;
                self.line.set_text(&search.lines[pos]);
                self.line
                    .set_point(usize::try_from(search.sline_index).unwrap_or(0));
            } else {
                outcome = Outcome::Bell;
            }
        }
        self.contexts.push(Context::IncrementalSearch(search));
        outcome
    }

    /// Text after the current match for `C-w` (one word) or `C-y` (the
    /// rest of the line).
    fn isearch_yank(&self, search: &ISearch, word: bool) -> Option<String> {
        let start = self.line.point() + search.query.len();
        let rest = self.line.as_str().get(start..).filter(|rest| !rest.is_empty())?;
        if !word {
            return Some(rest.to_string());
        }
        if !rest.chars().next().is_some_and(char::is_alphanumeric) {
            return None;
        }
        let end = rest
            .find(|c: char| !c.is_alphanumeric())
            .unwrap_or(rest.len());
        Some(rest[..end].to_string())
    }

    fn isearch_abort(&mut self, search: &ISearch) {
        debug!("incremental search cancelled");
        self.line.set_text(&search.lines[search.save_line]);
        self.line.set_point(search.save_point);
        self.line.set_mark(search.save_mark);
    }

    /// Make the last match the current history line.
    fn isearch_commit(&mut self, search: &ISearch) {
        debug!(
            found = search.last_found_line,
            query = %search.query,
            "incremental search done"
        );
        self.line.set_text(&search.lines[search.save_line]);
        if !search.query.is_empty() {
            self.last_isearch = Some(search.query.clone());
        }

        let steps = |n: usize| i32::try_from(n).unwrap_or(i32::MAX);
        if search.last_found_line < search.save_line {
            self.previous_history(steps(search.save_line - search.last_found_line));
        } else {
            self.next_history(steps(search.last_found_line - search.save_line));
        }

        let point = match usize::try_from(search.sline_index) {
            Ok(index) => index,
            Err(_) => {
                self.line.set_mark(search.save_mark);
                if search.last_found_line == search.save_line {
                    search.save_point
                } else {
                    self.line.len()
                }
            }
        };
        self.line.set_point(point);
    }

    /// End a search the input ran out in the middle of.
    pub(crate) fn isearch_finish_on_eof(&mut self) {
        if let Some(Context::IncrementalSearch(search)) = self.contexts.pop() {
            self.isearch_commit(&search);
        }
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
    use crate::session::{Input, Line};

    fn searchable(lines: &[&str]) -> (Session, Sink) {
        let (mut s, sink) = session();
        for line in lines {
            s.history_mut().add(line);
        }
        s.history_mut().reset_pos();
        (s, sink)
    }

    fn prompt_of(s: &Session) -> String {
        match s.contexts.last() {
            Some(Context::IncrementalSearch(search)) => search.prompt(),
            other => panic!("not searching: {other:?}"),
        }
    }

    #[test]
    fn reverse_search_walks_older_matches() {
        let (mut s, sink) = searchable(&["foo bar", "foo baz", "qux"]);
        s.feed(b"\x12foo");
        assert_eq!(s.line(), "foo baz");
        assert_eq!(s.point(), 0);
        assert_eq!(prompt_of(&s), "(reverse-i-search)`foo': ");

        s.feed(b"\x12");
        assert_eq!(s.line(), "foo bar");

        sink.take();
        s.feed(b"\x12");
        assert_eq!(s.line(), "foo bar");
        assert!(sink.text().contains('\x07'));
        assert_eq!(prompt_of(&s), "(failed reverse-i-search)`foo': ");
        assert!(s.display.row_text(0).starts_with("(failed reverse-i-search)`foo': foo bar"));
    }

    #[test]
    fn return_accepts_the_match() {
        let (mut s, _) = searchable(&["foo bar", "foo baz", "qux"]);
        let lines = s.feed(b"\x12foo\x12\r");
        assert_eq!(lines, vec![Line::Text("foo bar".into())]);
    }

    #[test]
    fn control_key_ends_search_and_runs() {
        let (mut s, _) = searchable(&["foo bar", "foo baz", "qux"]);
        s.feed(b"\x12foo\x05");
        assert_eq!(s.mode(), Mode::TopLevel);
        assert_eq!(s.line(), "foo baz");
        assert_eq!(s.point(), 7);
        assert_eq!(s.history().pos(), 1);
        assert_eq!(s.last_isearch.as_deref(), Some("foo"));
    }

    #[test]
    fn ctrl_g_restores_the_line_quietly() {
        let (mut s, sink) = searchable(&["foo bar", "qux"]);
        s.feed(b"draft\x02");
        s.feed(b"\x12qu");
        assert_eq!(s.line(), "qux");
        sink.take();
        s.feed(b"\x07");
        assert_eq!(s.mode(), Mode::TopLevel);
        assert_eq!(s.line(), "draft");
        assert_eq!(s.point(), 4);
        assert!(!sink.text().contains('\x07'));
    }

    #[test]
    fn escape_terminates_and_replays_pending_sequence() {
        let (mut s, _) = searchable(&["qux"]);
        s.feed(b"\x12ux\x1b");
        assert_eq!(s.mode(), Mode::TopLevel);
        assert_eq!(s.point(), 1);
        s.feed(b"b");
        assert_eq!(s.line(), "qbux");

        let (mut s, _) = searchable(&["qux"]);
        s.feed(b"\x12ux\x1bb");
        assert_eq!(s.line(), "qux");
        assert_eq!(s.point(), 0);
    }

    #[test]
    fn repeat_without_query_reuses_last() {
        let (mut s, _) = searchable(&["alpha", "beta"]);
        s.feed(b"\x12\x12");
        assert_eq!(s.mode(), Mode::IncrementalSearch);
        assert_eq!(s.line(), "");
        s.feed(b"\x07");

        s.feed(b"\x12alp\x1b");
        assert_eq!(s.line(), "alpha");
        s.feed(b"\x1b>");
        assert_eq!(s.line(), "");
        s.feed(b"\x12\x12");
        assert_eq!(s.line(), "alpha");
        assert_eq!(prompt_of(&s), "(reverse-i-search)`alp': ");
    }

    #[test]
    fn rubout_shortens_query() {
        let (mut s, sink) = searchable(&["alpha", "beta"]);
        s.feed(b"\x12bex");
        assert_eq!(prompt_of(&s), "(failed reverse-i-search)`bex': ");
        s.feed(b"\x7f");
        assert_eq!(prompt_of(&s), "(reverse-i-search)`be': ");
        assert_eq!(s.line(), "beta");
        s.feed(b"\x7f\x7f");
        sink.take();
        s.feed(b"\x7f");
        assert!(sink.text().contains('\x07'));
        assert_eq!(s.mode(), Mode::IncrementalSearch);
    }

    #[test]
    fn forward_search_from_old_entry() {
        let (mut s, _) = searchable(&["foo bar", "foo baz", "qux"]);
        s.feed(b"\x1b<");
        assert_eq!(s.line(), "foo bar");
        s.feed(b"\x13baz");
        assert_eq!(prompt_of(&s), "(i-search)`baz': ");
        assert_eq!(s.line(), "foo baz");
        let lines = s.feed(b"\r");
        assert_eq!(lines, vec![Line::Text("foo baz".into())]);
    }

    #[test]
    fn direction_can_flip() {
        let (mut s, _) = searchable(&["one", "two", "one more"]);
        s.feed(b"\x1b<\x13one");
        assert_eq!(s.line(), "one more");
        // Turning around finds the current match again first.
        s.feed(b"\x12");
        assert_eq!(prompt_of(&s), "(reverse-i-search)`one': ");
        assert_eq!(s.line(), "one more");
        s.feed(b"\x12");
        assert_eq!(s.line(), "one");
    }

    #[test]
    fn yank_word_and_line_into_query() {
        let (mut s, sink) = searchable(&["hello world"]);
        s.feed(b"\x12h\x17");
        assert_eq!(prompt_of(&s), "(reverse-i-search)`hello': ");
        sink.take();
        s.feed(b"\x17");
        assert!(sink.text().contains('\x07'));
        s.feed(b"\x19");
        assert_eq!(prompt_of(&s), "(reverse-i-search)`hello world': ");
        assert_eq!(s.line(), "hello world");
    }

    #[test]
    fn skips_duplicate_matches() {
        let (mut s, _) = searchable(&["make", "make", "make test"]);
        s.feed(b"\x12make");
        assert_eq!(s.line(), "make test");
        s.feed(b"\x12");
        assert_eq!(s.line(), "make");
        s.feed(b"\x12");
        assert_eq!(s.line(), "make");
        assert_eq!(prompt_of(&s), "(failed reverse-i-search)`make': ");
    }

    #[test]
    fn eof_commits_and_accepts() {
        let (mut s, _) = searchable(&["qux"]);
        s.feed(b"\x12ux");
        assert_eq!(s.step(Input::Eof), Some(Line::Text("qux".into())));
        assert_eq!(s.mode(), Mode::TopLevel);
    }

    #[test]
    fn unicode_query() {
        let (mut s, _) = searchable(&["café au lait", "tea"]);
        s.feed_str("\x12é");
        assert_eq!(s.line(), "café au lait");
        assert_eq!(s.point(), 3);
    }
}
