//! Line history — previously accepted lines and a browsing cursor.
//!
//! The history is an ordered list of [`HistoryEntry`] values, oldest first,
//! plus a **position**. Position `len()` means "the live line being typed";
//! a smaller position means the user is looking at that entry.
//!
//! Each entry carries an optional payload: the [`UndoLog`] of edits made to
//! it while browsing. Stepping away from an edited entry stores its current
//! text together with that log, so stepping back resumes the edit with undo
//! intact. When a line is accepted, every edited entry is reverted to its
//! original text.
//!
//! Persistence (history files) is out of scope: hosts read and write
//! entries with [`add`](History::add) and [`entries`](History::entries).

use crate::buffer::LineBuffer;
use crate::undo::UndoLog;

// ---------------------------------------------------------------------------
// Direction
// ---------------------------------------------------------------------------

/// Search direction through the history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Toward newer entries.
    Forward,
    /// Toward older entries.
    Reverse,
}

impl Direction {
    /// The opposite direction.
    #[must_use]
    pub const fn flip(self) -> Self {
        match self {
            Self::Forward => Self::Reverse,
            Self::Reverse => Self::Forward,
        }
    }

    /// `+1` forward, `-1` reverse.
    #[must_use]
    pub const fn step(self) -> isize {
        match self {
            Self::Forward => 1,
            Self::Reverse => -1,
        }
    }
}

// ---------------------------------------------------------------------------
// HistoryEntry
// ---------------------------------------------------------------------------

/// One history line and its edit payload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryEntry {
    /// The line text (edited text while an edit is stashed).
    pub line: String,
    /// Stashed undo log of edits made while browsing.
    pub data: Option<UndoLog>,
}

impl HistoryEntry {
    /// An unedited entry.
    #[must_use]
    pub fn new(line: &str) -> Self {
        Self {
            line: line.to_string(),
            data: None,
        }
    }
}

// ---------------------------------------------------------------------------
// History
// ---------------------------------------------------------------------------

/// The history list.
#[derive(Debug, Clone, Default)]
pub struct History {
    entries: Vec<HistoryEntry>,
    pos: usize,
    max: Option<usize>,
}

impl History {
    /// An empty, unlimited history.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            pos: 0,
            max: None,
        }
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if nothing has been added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Entry `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&HistoryEntry> {
        self.entries.get(index)
    }

    /// The newest entry's text.
    #[must_use]
    pub fn last(&self) -> Option<&str> {
        self.entries.last().map(|e| e.line.as_str())
    }

    /// The browsing position (`len()` for the live line).
    #[must_use]
    pub const fn pos(&self) -> usize {
        self.pos
    }

    /// Set the browsing position. Returns `false` (leaving it unchanged)
    /// if `pos > len()`.
    pub fn set_pos(&mut self, pos: usize) -> bool {
        if pos > self.entries.len() {
            return false;
        }
        self.pos = pos;
        true
    }

    /// Reset the position to the live line.
    pub fn reset_pos(&mut self) {
        self.pos = self.entries.len();
    }

    /// The entry at the browsing position, if any.
    #[must_use]
    pub fn current(&self) -> Option<&HistoryEntry> {
        self.entries.get(self.pos)
    }

    /// Step to the previous (older) entry.
    pub fn previous(&mut self) -> Option<&HistoryEntry> {
        if self.pos == 0 {
            return None;
        }
        self.pos -= 1;
        self.entries.get(self.pos)
    }

    /// Step to the next (newer) entry. Stepping off the newest entry moves
    /// to the live line and returns `None`.
    pub fn next(&mut self) -> Option<&HistoryEntry> {
        if self.pos >= self.entries.len() {
            return None;
        }
        self.pos += 1;
        self.entries.get(self.pos)
    }

    /// Append a line. The oldest entries are dropped beyond the size limit.
    pub fn add(&mut self, line: &str) {
        self.entries.push(HistoryEntry::new(line));
        self.enforce_limit();
    }

    /// Replace entry `index`, returning the old entry.
    pub fn replace_entry(&mut self, index: usize, entry: HistoryEntry) -> Option<HistoryEntry> {
        self.entries
            .get_mut(index)
            .map(|slot| std::mem::replace(slot, entry))
    }

    /// Limit the history to `max` entries (`None` for unlimited).
    pub fn stifle(&mut self, max: Option<usize>) {
        self.max = max;
        self.enforce_limit();
    }

    /// The size limit.
    #[must_use]
    pub const fn limit(&self) -> Option<usize> {
        self.max
    }

    /// Remove every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.pos = 0;
    }

    /// Undo the stashed edits of every entry that has them.
    pub fn revert_edits(&mut self) {
        for entry in &mut self.entries {
            if let Some(data) = entry.data.take() {
                let mut buf = LineBuffer::new();
                buf.load(std::mem::take(&mut entry.line), data);
                buf.revert();
                entry.line = buf.as_str().to_string();
            }
        }
    }

    /// Find the first entry containing `query`, starting at entry `from`
    /// (inclusive) and moving in `dir`. A leading `^` anchors the match to
    /// the start of the line.
    ///
    /// Returns the entry index and the byte offset of the match.
    #[must_use]
    pub fn search(&self, query: &str, from: usize, dir: Direction) -> Option<(usize, usize)> {
        let (needle, anchored) = match query.strip_prefix('^') {
            Some(rest) => (rest, true),
            None => (query, false),
        };
        if needle.is_empty() || self.entries.is_empty() {
            return None;
        }

        let matches = |i: usize| {
            let line = &self.entries[i].line;
            if anchored {
                line.starts_with(needle).then_some((i, 0))
            } else if dir == Direction::Reverse {
                line.rfind(needle).map(|off| (i, off))
            } else {
                line.find(needle).map(|off| (i, off))
            }
        };

        match dir {
            Direction::Reverse => {
                let from = from.min(self.entries.len() - 1);
                (0..=from).rev().find_map(matches)
            }
            Direction::Forward => (from..self.entries.len()).find_map(matches),
        }
    }

    fn enforce_limit(&mut self) {
        if let Some(max) = self.max {
            if self.entries.len() > max {
                let excess = self.entries.len() - max;
                self.entries.drain(..excess);
                self.pos = self.pos.saturating_sub(excess);
            }
        }
        self.pos = self.pos.min(self.entries.len());
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
