//! Undo log — reversible record of every line-buffer mutation.
//!
//! Each mutation of the [`LineBuffer`](crate::buffer::LineBuffer) appends an
//! [`UndoEntry`] describing how to reverse it, plus the point it had before
//! the change. Multi-step commands (`transpose-words`, `yank-pop`, history
//! search replacement) bracket their entries with [`UndoEntry::Begin`] and
//! [`UndoEntry::End`] so that one `undo` reverses the whole command.
//!
//! # Coalescing
//!
//! Typing is recorded one character at a time, but undoing one character at
//! a time is tedious. A single-character insert that starts exactly where
//! the previous insert ended extends that entry instead of adding a new
//! one, as long as the merged entry stays shorter than
//! [`COALESCE_LIMIT`] bytes.
//!
//! # Usage
//!
//! ```text
//! log.begin(point);
//! log.record_delete(start, removed_text, point);
//! log.record_insert(start, end, point, false);
//! log.end();
//! let unit = log.pop_unit();   // entries to reverse, newest first
//! ```
//!
//! Empty groups (begin immediately followed by end) are discarded — they
//! don't clutter the log.

// ---------------------------------------------------------------------------
// UndoEntry
// ---------------------------------------------------------------------------

/// Coalesced single-character inserts stop growing at this many bytes.
pub const COALESCE_LIMIT: usize = 20;

/// One reversible step. Offsets are byte offsets into the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UndoEntry {
    /// `start..end` was inserted. Undo = delete it.
    Insert {
        start: usize,
        end: usize,
        /// Point before the insert.
        point: usize,
    },

    /// `text` was removed from `start`. Undo = insert it back.
    Delete {
        start: usize,
        text: String,
        /// Point before the delete.
        point: usize,
    },

    /// Opens a group. `point` is where the cursor was before the group.
    Begin { point: usize },

    /// Closes the most recent open group.
    End,
}

// ---------------------------------------------------------------------------
// UndoUnit
// ---------------------------------------------------------------------------

/// What one `undo` has to reverse: the steps (newest first) and the point
/// to restore afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UndoUnit {
    pub steps: Vec<UndoEntry>,
    pub point: usize,
}

// ---------------------------------------------------------------------------
// UndoLog
// ---------------------------------------------------------------------------

/// The undo log of one line.
///
/// Groups may nest; only the outermost `begin`/`end` pair is written to the
/// log, so nested commands still undo as one unit.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UndoLog {
    entries: Vec<UndoEntry>,
    depth: usize,
}

impl UndoLog {
    /// An empty log.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
            depth: 0,
        }
    }

    /// True if there is nothing to undo.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of raw entries (group markers included).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// The raw entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[UndoEntry] {
        &self.entries
    }

    /// Forget everything.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.depth = 0;
    }

    /// True while a group is open.
    #[must_use]
    pub const fn in_group(&self) -> bool {
        self.depth > 0
    }

    /// Open a group. `point` is the cursor before any of the group's edits.
    pub fn begin(&mut self, point: usize) {
        if self.depth == 0 {
            self.entries.push(UndoEntry::Begin { point });
        }
        self.depth += 1;
    }

    /// Close the innermost open group. Unbalanced calls are ignored.
    pub fn end(&mut self) {
        match self.depth {
            0 => {}
            1 => {
                self.depth = 0;
                if matches!(self.entries.last(), Some(UndoEntry::Begin { .. })) {
                    self.entries.pop();
                } else {
                    self.entries.push(UndoEntry::End);
                }
            }
            _ => self.depth -= 1,
        }
    }

    /// Record that `start..end` was inserted while point was at `point`.
    ///
    /// `single_char` marks a one-character insert eligible for coalescing
    /// with the previous insert.
    pub fn record_insert(&mut self, start: usize, end: usize, point: usize, single_char: bool) {
        if single_char {
            if let Some(UndoEntry::Insert {
                start: prev_start,
                end: prev_end,
                ..
            }) = self.entries.last_mut()
            {
                if *prev_end == start && *prev_end - *prev_start < COALESCE_LIMIT {
                    *prev_end = end;
                    return;
                }
            }
        }
        self.entries.push(UndoEntry::Insert { start, end, point });
    }

    /// Record that `text` was removed from `start` while point was at `point`.
    pub fn record_delete(&mut self, start: usize, text: String, point: usize) {
        if !text.is_empty() {
            self.entries.push(UndoEntry::Delete { start, text, point });
        }
    }

    /// Remove the most recent undoable unit: one entry, or one whole group.
    ///
    /// Returns `None` when the log is empty.
    pub fn pop_unit(&mut self) -> Option<UndoUnit> {
        // Close any group left open so it can be undone as a unit.
        while self.depth > 0 {
            self.end();
        }

        let last = self.entries.pop()?;
        if last != UndoEntry::End {
            let point = entry_point(&last);
            return Some(UndoUnit {
                steps: vec![last],
                point,
            });
        }

        let mut steps = Vec::new();
        let mut nesting = 1usize;
        while let Some(entry) = self.entries.pop() {
            match entry {
                UndoEntry::End => nesting += 1,
                UndoEntry::Begin { point } => {
                    nesting -= 1;
                    if nesting == 0 {
                        return Some(UndoUnit { steps, point });
                    }
                }
                other => steps.push(other),
            }
        }

        // A group with no Begin (the log was truncated). Undo what is there.
        let point = steps.last().map_or(0, entry_point);
        Some(UndoUnit { steps, point })
    }
}

/// The point an entry restores when undone on its own.
fn entry_point(entry: &UndoEntry) -> usize {
    match entry {
        UndoEntry::Insert { point, .. }
        | UndoEntry::Delete { point, .. }
        | UndoEntry::Begin { point } => *point,
        UndoEntry::End => 0,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- recording ----------------------------------------------------------

    #[test]
    fn single_chars_coalesce() {
        let mut log = UndoLog::new();
        log.record_insert(0, 1, 0, true);
        log.record_insert(1, 2, 1, true);
        log.record_insert(2, 3, 2, true);
        assert_eq!(
            log.entries(),
            &[UndoEntry::Insert {
                start: 0,
                end: 3,
                point: 0
            }]
        );
    }

    #[test]
    fn coalescing_stops_at_limit() {
        let mut log = UndoLog::new();
        for i in 0..=COALESCE_LIMIT {
            log.record_insert(i, i + 1, i, true);
        }
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn non_adjacent_inserts_stay_separate() {
        let mut log = UndoLog::new();
        log.record_insert(0, 1, 0, true);
        log.record_insert(5, 6, 5, true);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn multi_char_insert_never_coalesces() {
        let mut log = UndoLog::new();
        log.record_insert(0, 1, 0, true);
        log.record_insert(1, 4, 1, false);
        assert_eq!(log.len(), 2);
    }

    #[test]
    fn empty_delete_not_recorded() {
        let mut log = UndoLog::new();
        log.record_delete(0, String::new(), 0);
        assert!(log.is_empty());
    }

    // -- groups -------------------------------------------------------------

    #[test]
    fn empty_group_discarded() {
        let mut log = UndoLog::new();
        log.begin(3);
        log.end();
        assert!(log.is_empty());
    }

    #[test]
    fn nested_groups_write_one_pair() {
        let mut log = UndoLog::new();
        log.begin(0);
        log.begin(0);
        log.record_insert(0, 2, 0, false);
        log.end();
        assert!(log.in_group());
        log.end();
        assert!(!log.in_group());
        assert_eq!(log.len(), 3);
    }

    #[test]
    fn unbalanced_end_ignored() {
        let mut log = UndoLog::new();
        log.end();
        assert!(log.is_empty());
        assert!(!log.in_group());
    }

    // -- pop_unit -----------------------------------------------------------

    #[test]
    fn pop_single_entry() {
        let mut log = UndoLog::new();
        log.record_insert(3, 4, 3, true);
        let unit = log.pop_unit().unwrap();
        assert_eq!(unit.point, 3);
        assert_eq!(unit.steps.len(), 1);
        assert!(log.pop_unit().is_none());
    }

    #[test]
    fn pop_group_returns_newest_first() {
        let mut log = UndoLog::new();
        log.record_insert(0, 1, 0, true);
        log.begin(7);
        log.record_delete(2, "ab".into(), 7);
        log.record_insert(2, 4, 2, false);
        log.end();

        let unit = log.pop_unit().unwrap();
        assert_eq!(unit.point, 7);
        assert_eq!(
            unit.steps,
            vec![
                UndoEntry::Insert {
                    start: 2,
                    end: 4,
                    point: 2
                },
                UndoEntry::Delete {
                    start: 2,
                    text: "ab".into(),
                    point: 7
                },
            ]
        );
        assert_eq!(log.len(), 1);
    }

    #[test]
    fn pop_closes_open_group() {
        let mut log = UndoLog::new();
        log.begin(1);
        log.record_insert(1, 2, 1, false);
        let unit = log.pop_unit().unwrap();
        assert_eq!(unit.point, 1);
        assert!(log.is_empty());
    }
}
