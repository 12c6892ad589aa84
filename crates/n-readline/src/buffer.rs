//! Line buffer — the text being edited, with point, mark, and undo.
//!
//! A `LineBuffer` owns one line of UTF-8 text plus two offsets into it:
//! **point** (the cursor) and **mark** (the anchor of the region). Every
//! mutation goes through [`insert`](LineBuffer::insert),
//! [`delete`](LineBuffer::delete) or [`replace`](LineBuffer::replace), which
//! keep point and mark valid and append to the line's [`UndoLog`].
//!
//! # Design choices
//!
//! - **Offsets are byte offsets** into the `String`, always on a char
//!   boundary. Redisplay and searching work on bytes; movement commands step
//!   by grapheme cluster so that `é` written as `e` + combining accent moves
//!   as one unit.
//!
//! - **Invariant:** `0 ≤ point ≤ len` and `0 ≤ mark ≤ len` after every
//!   public call. Setters clamp rather than fail.
//!
//! - **Undo lives here.** The log is part of the line, not of the session:
//!   history navigation stashes a half-edited line together with its log
//!   and hands both back when the user returns to that entry.

use std::fmt;
use std::ops::Range;

use unicode_segmentation::UnicodeSegmentation;

use crate::undo::{UndoEntry, UndoLog};

// ---------------------------------------------------------------------------
// LineBuffer
// ---------------------------------------------------------------------------

/// The editable line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineBuffer {
    text: String,
    point: usize,
    mark: usize,
    undo: UndoLog,
}

impl LineBuffer {
    /// Create an empty line.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            text: String::new(),
            point: 0,
            mark: 0,
            undo: UndoLog::new(),
        }
    }

    /// Create a line holding `text` with point at the end and no undo
    /// history.
    #[must_use]
    pub fn with_text(text: &str) -> Self {
        Self {
            text: text.to_string(),
            point: text.len(),
            mark: 0,
            undo: UndoLog::new(),
        }
    }

    // -- Accessors ----------------------------------------------------------

    /// The line contents.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Length in bytes (the `end` offset).
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.text.len()
    }

    /// True if the line is empty.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Cursor offset.
    #[inline]
    #[must_use]
    pub const fn point(&self) -> usize {
        self.point
    }

    /// Region anchor offset.
    #[inline]
    #[must_use]
    pub const fn mark(&self) -> usize {
        self.mark
    }

    /// The text in `range`, or `""` if the range is out of bounds.
    #[must_use]
    pub fn slice(&self, range: Range<usize>) -> &str {
        self.text.get(range).unwrap_or("")
    }

    /// The undo log for this line.
    #[must_use]
    pub const fn undo_log(&self) -> &UndoLog {
        &self.undo
    }

    // -- Point & mark -------------------------------------------------------

    /// Move point, clamped to the line and snapped back to a char boundary.
    pub fn set_point(&mut self, pos: usize) {
        self.point = self.floor_boundary(pos);
    }

    /// Move mark, clamped like [`set_point`](Self::set_point).
    pub fn set_mark(&mut self, pos: usize) {
        self.mark = self.floor_boundary(pos);
    }

    /// Swap point and mark.
    pub fn exchange_point_and_mark(&mut self) {
        std::mem::swap(&mut self.point, &mut self.mark);
    }

    /// Offset of the grapheme boundary after `pos` (or `len` at the end).
    #[must_use]
    pub fn next_boundary(&self, pos: usize) -> usize {
        let pos = self.floor_boundary(pos);
        self.text[pos..]
            .graphemes(true)
            .next()
            .map_or(self.text.len(), |g| pos + g.len())
    }

    /// Offset of the grapheme boundary before `pos` (or 0 at the start).
    #[must_use]
    pub fn prev_boundary(&self, pos: usize) -> usize {
        let pos = self.floor_boundary(pos);
        self.text[..pos]
            .graphemes(true)
            .next_back()
            .map_or(0, |g| pos - g.len())
    }

    /// The char starting at `pos`, if any.
    #[must_use]
    pub fn char_at(&self, pos: usize) -> Option<char> {
        self.text.get(pos..).and_then(|s| s.chars().next())
    }

    /// Clamp `pos` to the line and round down to a char boundary.
    fn floor_boundary(&self, pos: usize) -> usize {
        let mut pos = pos.min(self.text.len());
        while !self.text.is_char_boundary(pos) {
            pos -= 1;
        }
        pos
    }

    // -- Mutation -----------------------------------------------------------

    /// Insert `s` at point and advance point past it.
    pub fn insert(&mut self, s: &str) {
        self.insert_at(self.point, s);
    }

    /// Insert `s` at `pos`. Point moves with the text when it sits at or
    /// after `pos`; mark moves when it sits after `pos`.
    pub fn insert_at(&mut self, pos: usize, s: &str) {
        if s.is_empty() {
            return;
        }
        let pos = self.floor_boundary(pos);
        let before = self.point;
        self.text.insert_str(pos, s);
        if self.point >= pos {
            self.point += s.len();
        }
        if self.mark > pos {
            self.mark += s.len();
        }
        let single = s.chars().nth(1).is_none();
        self.undo.record_insert(pos, pos + s.len(), before, single);
    }

    /// Delete `range` and return the removed text.
    ///
    /// The range is clamped to the line. Point and mark inside the range
    /// collapse to its start; after it, they shift left.
    pub fn delete(&mut self, range: Range<usize>) -> String {
        let start = self.floor_boundary(range.start.min(range.end));
        let end = self.floor_boundary(range.end.max(range.start));
        if start == end {
            return String::new();
        }
        let before = self.point;
        let removed: String = self.text.drain(start..end).collect();
        self.point = shift_after_delete(self.point, start, end);
        self.mark = shift_after_delete(self.mark, start, end);
        self.undo.record_delete(start, removed.clone(), before);
        removed
    }

    /// Replace `range` with `s` as one undoable unit. Point ends after the
    /// new text.
    pub fn replace(&mut self, range: Range<usize>, s: &str) {
        self.begin_group();
        let start = self.floor_boundary(range.start.min(range.end));
        self.delete(range);
        self.point = start;
        self.insert_at(start, s);
        self.end_group();
    }

    /// Replace the whole line with `text` without touching the undo log.
    /// Point goes to the end, mark to the start.
    pub fn set_text(&mut self, text: &str) {
        text.clone_into(&mut self.text);
        self.point = self.text.len();
        self.mark = 0;
    }

    /// Install `text` together with its undo log (history navigation).
    pub fn load(&mut self, text: String, undo: UndoLog) {
        self.text = text;
        self.undo = undo;
        self.point = self.text.len();
        self.mark = 0;
    }

    /// Take the undo log, leaving an empty one.
    pub fn take_undo(&mut self) -> UndoLog {
        std::mem::take(&mut self.undo)
    }

    /// Empty the line and its undo log.
    pub fn clear(&mut self) {
        self.text.clear();
        self.point = 0;
        self.mark = 0;
        self.undo.clear();
    }

    // -- Undo ---------------------------------------------------------------

    /// Open an undo group. Groups nest.
    pub fn begin_group(&mut self) {
        self.undo.begin(self.point);
    }

    /// Close the innermost undo group.
    pub fn end_group(&mut self) {
        self.undo.end();
    }

    /// Reverse the most recent entry or group and restore its point.
    /// Returns `false` if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Some(unit) = self.undo.pop_unit() else {
            return false;
        };
        for step in unit.steps {
            match step {
                UndoEntry::Insert { start, end, .. } => {
                    let end = end.min(self.text.len());
                    if start < end {
                        self.text.drain(start..end);
                        self.mark = shift_after_delete(self.mark, start, end);
                    }
                }
                UndoEntry::Delete { start, text, .. } => {
                    let start = start.min(self.text.len());
                    self.text.insert_str(start, &text);
                    if self.mark > start {
                        self.mark += text.len();
                    }
                }
                UndoEntry::Begin { .. } | UndoEntry::End => {}
            }
        }
        self.point = self.floor_boundary(unit.point);
        self.mark = self.floor_boundary(self.mark);
        true
    }

    /// Undo everything. Returns `false` if the log was already empty.
    pub fn revert(&mut self) -> bool {
        let mut any = false;
        while self.undo() {
            any = true;
        }
        any
    }
}

impl fmt::Display for LineBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Where an offset lands after `start..end` is removed.
const fn shift_after_delete(pos: usize, start: usize, end: usize) -> usize {
    if pos >= end {
        pos - (end - start)
    } else if pos > start {
        start
    } else {
        pos
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
