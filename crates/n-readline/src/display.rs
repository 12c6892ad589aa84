//! Redisplay — paint the prompt and line with minimal terminal updates.
//!
//! The engine keeps two [`Frame`]s: `visible`, what the terminal currently
//! shows, and `pending`, what it should show. Each pass renders the prompt
//! and line into `pending`, diffs it row by row against `visible`, emits the
//! cheapest updates it can find, and swaps the frames.
//!
//! # Rendering
//!
//! - Tabs expand to the next multiple of 8 columns.
//! - Control characters show as `^X`, DEL as `^?`.
//! - Wide characters take two columns and never straddle the right margin.
//! - Prompt text between `\x01` and `\x02` is sent but takes no columns
//!   (colour escapes). Those bytes on row 0 are the frame's wrap offset.
//! - If the cursor would sit exactly on the right margin, the frame gets an
//!   empty extra row so the cursor can live at its start.
//!
//! # Row updates
//!
//! For each row the first and last differing glyphs bound the changed
//! span. A shared tail made only of spaces is not trusted (blank cells and
//! printed spaces look alike) and is repainted. Then:
//!
//! | Change | Strategy |
//! |--------|----------|
//! | row grew | open cells with `ic`/`IC` and print the new span, or print to end of row |
//! | row shrank | drop cells with `dc`/`DC` and print the new span, or print to end of row and clear (`ce`) |
//! | same width | print the new span |
//!
//! Cell insertion is used when twice the width of the new text from the
//! first difference covers the growth (or a parameterized `IC` exists);
//! deletion when twice that width covers the shrink.
//!
//! # Cursor motion
//!
//! Moving left either backspaces (`le`/`LE`) or returns the carriage and
//! reprints up to the target column, whichever is strictly shorter in
//! bytes. Moving right reprints. Rows change with `up` and newline. A
//! cursor parked on the right margin (pending wrap) returns the carriage
//! before any other motion.
//!
//! # Terminals without `up`
//!
//! A wrapped line cannot be redrawn on a terminal that cannot move the
//! cursor up. There the line is shown on a single row instead, scrolled
//! horizontally so the cursor stays inside it. The last column is left
//! unused so the terminal never wraps.

use std::mem;

use n_term::caps::{Cap, Capabilities};
use n_term::output::OutputBuffer;
use tracing::trace;
use unicode_width::UnicodeWidthChar;

use crate::options::BellStyle;

/// Tab stops every this many columns.
pub const TAB_WIDTH: usize = 8;

/// Starts a non-printing prompt segment.
pub const START_IGNORE: char = '\x01';

/// Ends a non-printing prompt segment.
pub const END_IGNORE: char = '\x02';

// ---------------------------------------------------------------------------
// Frame
// ---------------------------------------------------------------------------

/// One rendered cell group: `len` bytes of `Frame::text` from `start`,
/// occupying `width` columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Glyph {
    start: usize,
    len: usize,
    width: usize,
}

/// A rendered screen image of the prompt and line.
#[derive(Debug, Clone, Default)]
struct Frame {
    text: Vec<u8>,
    glyphs: Vec<Glyph>,
    /// Index into `glyphs` where each row starts.
    breaks: Vec<usize>,
    wrap_offset: usize,
    cursor: (usize, usize),
}

impl Frame {
    fn clear(&mut self) {
        self.text.clear();
        self.glyphs.clear();
        self.breaks.clear();
        self.wrap_offset = 0;
        self.cursor = (0, 0);
    }

    fn rows(&self) -> usize {
        self.breaks.len()
    }

    fn row(&self, r: usize) -> &[Glyph] {
        let Some(&start) = self.breaks.get(r) else {
            return &[];
        };
        let end = self.breaks.get(r + 1).copied().unwrap_or(self.glyphs.len());
        &self.glyphs[start..end]
    }

    fn bytes(&self, g: Glyph) -> &[u8] {
        &self.text[g.start..g.start + g.len]
    }

    fn same(&self, a: Glyph, other: &Self, b: Glyph) -> bool {
        a.width == b.width && self.bytes(a) == other.bytes(b)
    }
}

fn width_of(glyphs: &[Glyph]) -> usize {
    glyphs.iter().map(|g| g.width).sum()
}

// ---------------------------------------------------------------------------
// Layout
// ---------------------------------------------------------------------------

/// Lays glyphs out into a frame, breaking rows at `width`.
struct Layout<'a> {
    frame: &'a mut Frame,
    width: usize,
    col: usize,
}

impl<'a> Layout<'a> {
    fn new(frame: &'a mut Frame, width: usize) -> Self {
        frame.clear();
        frame.breaks.push(0);
        Self {
            frame,
            width,
            col: 0,
        }
    }

    fn new_row(&mut self) {
        self.frame.breaks.push(self.frame.glyphs.len());
        self.col = 0;
    }

    fn push(&mut self, bytes: &[u8], width: usize) {
        if width > 0 && self.col > 0 && self.col + width > self.width {
            self.new_row();
        }
        let start = self.frame.text.len();
        self.frame.text.extend_from_slice(bytes);
        self.frame.glyphs.push(Glyph {
            start,
            len: bytes.len(),
            width,
        });
        self.col += width;
    }

    /// Append zero-width bytes to the previous glyph on this row.
    fn attach(&mut self, bytes: &[u8]) {
        let row_start = self.frame.breaks.last().copied().unwrap_or(0);
        if self.frame.glyphs.len() > row_start {
            self.frame.text.extend_from_slice(bytes);
            if let Some(last) = self.frame.glyphs.last_mut() {
                last.len += bytes.len();
            }
        } else {
            self.push(bytes, 0);
        }
    }

    fn push_char(&mut self, ch: char) {
        let mut utf8 = [0u8; 4];
        match ch {
            '\t' => {
                if self.col >= self.width {
                    self.new_row();
                }
                let n = (TAB_WIDTH - self.col % TAB_WIDTH).min(self.width - self.col);
                self.push(&b"        "[..n.min(TAB_WIDTH)], n);
            }
            '\x7f' => self.push(b"^?", 2),
            c if u32::from(c) < 0x20 => {
                // Control characters are ASCII, so the cast is exact.
                self.push(&[b'^', c as u8 + 0x40], 2);
            }
            c => match c.width() {
                Some(0) => self.attach(c.encode_utf8(&mut utf8).as_bytes()),
                Some(w) => self.push(c.encode_utf8(&mut utf8).as_bytes(), w),
                None => {
                    let shown = format!("\\{:o}", u32::from(c));
                    self.push(shown.as_bytes(), shown.len());
                }
            },
        }
    }

    fn push_prompt(&mut self, prompt: &str) {
        let mut rest = prompt;
        while let Some(start) = rest.find(START_IGNORE) {
            for ch in rest[..start].chars() {
                self.push_char(ch);
            }
            let after = &rest[start + 1..];
            let end = after.find(END_IGNORE).unwrap_or(after.len());
            let hidden = &after[..end];
            if !hidden.is_empty() {
                self.push(hidden.as_bytes(), 0);
                if self.frame.rows() == 1 {
                    self.frame.wrap_offset += hidden.len();
                }
            }
            rest = after.get(end + 1..).unwrap_or("");
        }
        for ch in rest.chars() {
            self.push_char(ch);
        }
    }

    fn mark_cursor(&mut self) {
        if self.col >= self.width {
            self.new_row();
        }
        self.frame.cursor = (self.frame.rows() - 1, self.col);
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// The redisplay engine for one terminal.
#[derive(Debug)]
pub struct Display {
    caps: Capabilities,
    width: usize,
    visible: Frame,
    pending: Frame,
    /// Physical cursor row, relative to the first row of the prompt.
    row: usize,
    /// Physical cursor column. Equal to `width` while a wrap is pending.
    col: usize,
    /// The screen geometry changed; repaint from scratch.
    stale: bool,
    /// First column shown when scrolling horizontally.
    hscroll: usize,
    out: OutputBuffer,
}

impl Display {
    /// A display for a terminal with `caps`, `width` columns wide.
    #[must_use]
    pub fn new(caps: Capabilities, width: usize) -> Self {
        Self {
            caps,
            width: width.max(1),
            visible: Frame::default(),
            pending: Frame::default(),
            row: 0,
            col: 0,
            stale: false,
            hscroll: 0,
            out: OutputBuffer::new(),
        }
    }

    /// The capability table in use.
    #[must_use]
    pub const fn caps(&self) -> &Capabilities {
        &self.caps
    }

    /// Screen width in columns.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Change the screen width. The next redisplay repaints everything.
    pub fn set_width(&mut self, width: usize) {
        let width = width.max(1);
        if width != self.width {
            self.width = width;
            self.stale = true;
        }
    }

    /// Physical cursor position as `(row, col)` relative to the prompt.
    #[must_use]
    pub const fn cursor(&self) -> (usize, usize) {
        (self.row, self.col)
    }

    /// True if the line is shown on one horizontally scrolled row.
    #[must_use]
    pub fn scrolls_horizontally(&self) -> bool {
        !(self.caps.has(Cap::CursorUp) || self.caps.has(Cap::ParmUp))
    }

    /// Rows currently painted.
    #[must_use]
    pub fn rows(&self) -> usize {
        self.visible.rows()
    }

    /// Non-printing prompt bytes on the first painted row.
    #[must_use]
    pub const fn wrap_offset(&self) -> usize {
        self.visible.wrap_offset
    }

    /// The text painted on row `r`, as the terminal received it.
    #[must_use]
    pub fn row_text(&self, r: usize) -> String {
        let bytes: Vec<u8> = self
            .visible
            .row(r)
            .iter()
            .flat_map(|&g| self.visible.bytes(g).iter().copied())
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Bytes produced so far and not yet flushed.
    pub fn output(&mut self) -> &mut OutputBuffer {
        &mut self.out
    }

    /// Take the pending output bytes.
    #[must_use]
    pub fn take_output(&mut self) -> Vec<u8> {
        self.out.take()
    }

    // -- Passes -------------------------------------------------------------

    /// Bring the screen up to date with `prompt` + `line`, cursor at byte
    /// offset `point` of `line`.
    pub fn redisplay(&mut self, prompt: &str, line: &str, point: usize) {
        if self.stale {
            self.stale = false;
            self.cr();
            self.out.put_cap(&self.caps, Cap::ClearEol);
            self.visible.clear();
            self.row = 0;
        }

        self.render(prompt, line, point);

        let old_rows = self.visible.rows();
        let new_rows = self.pending.rows();
        for r in 0..new_rows {
            self.update_row(r);
        }
        for r in new_rows..old_rows {
            let w = width_of(self.visible.row(r));
            self.move_to(r, 0);
            self.clear_cells(w);
        }
        let (row, col) = self.pending.cursor;
        self.move_to(row, col);

        trace!(rows = new_rows, cursor = ?(row, col), "redisplay");
        mem::swap(&mut self.visible, &mut self.pending);
    }

    /// Erase every painted row and home the cursor on the first, so the
    /// next [`redisplay`](Self::redisplay) paints from scratch.
    pub fn clear_visible(&mut self) {
        self.pending.clone_from(&self.visible);
        for r in (0..self.visible.rows()).rev() {
            let w = width_of(self.visible.row(r));
            self.move_to(r, 0);
            self.clear_cells(w);
        }
        self.move_to(0, 0);
        self.visible.clear();
    }

    /// Clear the whole screen. Without `cl`, start a fresh row instead.
    pub fn clear_screen(&mut self) {
        if !self.out.put_cap(&self.caps, Cap::ClearScreen) {
            self.cr();
            self.newline();
        }
        self.visible.clear();
        self.row = 0;
        self.col = 0;
        self.hscroll = 0;
    }

    /// Leave the cursor on a fresh row below the painted line and forget
    /// the line.
    pub fn finish_line(&mut self) {
        self.pending.clone_from(&self.visible);
        let last = self.visible.rows().saturating_sub(1);
        let end = width_of(self.visible.row(last));
        self.move_to(last, end);
        self.cr();
        self.newline();
        self.on_new_line();
    }

    /// Forget what is painted: the cursor is at column 0 of an empty row.
    pub fn on_new_line(&mut self) {
        self.visible.clear();
        self.row = 0;
        self.col = 0;
        self.hscroll = 0;
    }

    /// Ring the bell in `style`.
    pub fn bell(&mut self, style: BellStyle) {
        let flashed = match style {
            BellStyle::None => return,
            BellStyle::Visible => self.out.put_cap(&self.caps, Cap::VisibleBell),
            BellStyle::Audible => false,
        };
        if !flashed && !self.out.put_cap(&self.caps, Cap::Bell) {
            self.out.put_bytes(b"\x07");
        }
    }

    // -- Rendering ----------------------------------------------------------

    fn render(&mut self, prompt: &str, line: &str, point: usize) {
        let scroll = self.scrolls_horizontally();
        let width = if scroll { usize::MAX / 2 } else { self.width };
        let mut layout = Layout::new(&mut self.pending, width);
        layout.push_prompt(prompt);
        for (i, ch) in line.char_indices() {
            if i == point {
                layout.mark_cursor();
            }
            layout.push_char(ch);
        }
        if point >= line.len() {
            layout.mark_cursor();
        }
        if scroll {
            self.window_pending();
        }
    }

    /// Cut the single-row pending frame down to the window of columns
    /// around the cursor.
    fn window_pending(&mut self) {
        let span = self.width.saturating_sub(1).max(1);
        let cursor = self.pending.cursor.1;
        if cursor < self.hscroll || cursor >= self.hscroll + span {
            self.hscroll = cursor.saturating_sub(span / 2);
        }

        let full = mem::take(&mut self.pending);
        let mut window = Frame::default();
        window.breaks.push(0);
        let mut col = 0;
        let mut offset = None;
        for &g in &full.glyphs {
            if col >= self.hscroll && col + g.width <= self.hscroll + span {
                offset.get_or_insert(col);
                let start = window.text.len();
                window.text.extend_from_slice(full.bytes(g));
                window.glyphs.push(Glyph { start, ..g });
            }
            col += g.width;
        }
        let offset = offset.unwrap_or(self.hscroll);
        if offset == 0 {
            window.wrap_offset = full.wrap_offset;
        }
        window.cursor = (0, cursor.saturating_sub(offset));
        self.pending = window;
    }

    // -- Row update ---------------------------------------------------------

    fn update_row(&mut self, r: usize) {
        let old = self.visible.row(r).to_vec();
        let new = self.pending.row(r).to_vec();

        let mut first = 0;
        while first < old.len()
            && first < new.len()
            && self.visible.same(old[first], &self.pending, new[first])
        {
            first += 1;
        }
        if first == old.len() && first == new.len() {
            return;
        }

        let (mut old_end, mut new_end) = (old.len(), new.len());
        let mut blank_tail = true;
        while old_end > first
            && new_end > first
            && self
                .visible
                .same(old[old_end - 1], &self.pending, new[new_end - 1])
        {
            if self.pending.bytes(new[new_end - 1]) != b" " {
                blank_tail = false;
            }
            old_end -= 1;
            new_end -= 1;
        }
        if blank_tail {
            old_end = old.len();
            new_end = new.len();
        }

        let col_start = width_of(&new[..first]);
        let old_span = width_of(&old[first..old_end]);
        let new_span = width_of(&new[first..new_end]);
        let new_rest = width_of(&new[first..]);
        let old_total = width_of(&old);
        let new_total = width_of(&new);

        self.move_to(r, col_start);

        if new_span > old_span {
            let grow = new_span - old_span;
            let insert = !old.is_empty()
                && self.caps.can_insert()
                && (2 * new_rest >= grow || self.caps.has(Cap::ParmInsertChar));
            if insert && self.out.put_cap_n(&self.caps, Cap::InsertChar, grow) {
                self.print(&new[first..new_end]);
            } else {
                self.print(&new[first..]);
            }
        } else if new_span < old_span {
            let shrink = old_span - new_span;
            let delete = self.caps.can_delete() && 2 * new_rest >= shrink;
            if delete && self.out.put_cap_n(&self.caps, Cap::DeleteChar, shrink) {
                self.print(&new[first..new_end]);
            } else {
                self.print(&new[first..]);
                if old_total > new_total {
                    self.clear_cells(old_total - new_total);
                }
            }
        } else {
            self.print(&new[first..new_end]);
        }
    }

    /// Print glyphs from the pending frame at the cursor.
    fn print(&mut self, glyphs: &[Glyph]) {
        for &g in glyphs {
            self.out.put_bytes(self.pending.bytes(g));
            self.col += g.width;
        }
    }

    /// Erase `n` cells from the cursor to the right.
    fn clear_cells(&mut self, n: usize) {
        if n == 0 {
            return;
        }
        if !self.out.put_cap(&self.caps, Cap::ClearEol) {
            self.out.put_repeated(b' ', n);
            self.col += n;
        }
    }

    // -- Cursor motion ------------------------------------------------------

    fn cr(&mut self) {
        if !self.out.put_cap(&self.caps, Cap::CarriageReturn) {
            self.out.put_bytes(b"\r");
        }
        self.col = 0;
    }

    fn newline(&mut self) {
        if !self.out.put_cap(&self.caps, Cap::Newline) {
            self.out.put_bytes(b"\n");
        }
    }

    fn move_to(&mut self, row: usize, col: usize) {
        if self.col >= self.width && (row, col) != (self.row, self.col) {
            self.cr();
        }

        if row > self.row {
            for _ in self.row..row {
                self.newline();
            }
            self.row = row;
            if self.col != 0 {
                self.cr();
            }
        } else if row < self.row {
            if !self.out.put_cap_n(&self.caps, Cap::CursorUp, self.row - row) {
                // Single-row frames never get here; repaint if one does.
                self.stale = true;
            }
            self.row = row;
        }

        if col < self.col {
            let n = self.col - col;
            let reprint = self.reprint_cost(row, col);
            let cr = self.caps.cost(Cap::CarriageReturn, 0).unwrap_or(1);
            if reprint.is_some_and(|bytes| cr + bytes < self.left_cost(n)) {
                self.cr();
                self.forward(row, col);
            } else {
                if !self.out.put_cap_n(&self.caps, Cap::CursorLeft, n) {
                    self.out.put_repeated(b'\x08', n);
                }
                self.col = col;
            }
        } else if col > self.col {
            self.forward(row, col);
        }
    }

    /// Bytes needed to move left `n` columns with `le`/`LE`.
    fn left_cost(&self, n: usize) -> usize {
        let single = self.caps.cost(Cap::CursorLeft, 1).unwrap_or(1);
        if n == 1 {
            return single;
        }
        self.caps.cost(Cap::ParmLeft, n).unwrap_or(single * n)
    }

    /// Bytes of the pending row `row` from column 0 up to `col`, or `None`
    /// if `col` is not a glyph boundary.
    fn reprint_cost(&self, row: usize, col: usize) -> Option<usize> {
        let mut at = 0;
        let mut bytes = 0;
        for &g in self.pending.row(row) {
            if at >= col {
                break;
            }
            at += g.width;
            bytes += g.len;
        }
        (at == col).then_some(bytes)
    }

    /// Move right by reprinting the pending row from the cursor to `col`.
    fn forward(&mut self, row: usize, col: usize) {
        let glyphs = self.pending.row(row).to_vec();
        let mut at = 0;
        let mut idx = 0;
        while idx < glyphs.len() && at < self.col {
            at += glyphs[idx].width;
            idx += 1;
        }
        if at != self.col {
            self.cr();
            idx = 0;
        }
        while idx < glyphs.len() && self.col < col {
            self.out.put_bytes(self.pending.bytes(glyphs[idx]));
            self.col += glyphs[idx].width;
            idx += 1;
        }
        if self.col < col {
            // Past the painted text: the cells are blank.
            let n = col - self.col;
            if !self.out.put_cap_n(&self.caps, Cap::CursorRight, n) {
                self.out.put_repeated(b' ', n);
            }
            self.col = col;
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn painted(d: &mut Display, prompt: &str, line: &str, point: usize) -> String {
        d.redisplay(prompt, line, point);
        String::from_utf8_lossy(&d.take_output()).into_owned()
    }

    // ── Rendering ───────────────────────────────────────────────────────

    #[test]
    fn first_paint_prints_prompt_and_line() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        assert_eq!(painted(&mut d, "$ ", "ls", 2), "$ ls");
        assert_eq!(d.cursor(), (0, 4));
    }

    #[test]
    fn control_chars_and_tabs() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        d.redisplay("", "a\x01\tb\x7f", 0);
        assert_eq!(d.row_text(0), "a^A     b^?");
    }

    #[test]
    fn invisible_prompt_segments() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        let out = painted(&mut d, "\x01\x1b[1m\x02>\x01\x1b[0m\x02 ", "", 0);
        assert_eq!(out, "\x1b[1m>\x1b[0m ");
        assert_eq!(d.cursor(), (0, 2));
        assert_eq!(d.wrap_offset(), 8);
    }

    #[test]
    fn wide_glyph_wraps_whole() {
        let mut d = Display::new(Capabilities::xterm(), 5);
        d.redisplay("", "abcd漢", 0);
        assert_eq!(d.rows(), 2);
        assert_eq!(d.row_text(0), "abcd");
        assert_eq!(d.row_text(1), "漢");
    }

    #[test]
    fn cursor_on_margin_gets_empty_row() {
        let mut d = Display::new(Capabilities::xterm(), 10);
        let out = painted(&mut d, "", "abcdefghij", 10);
        assert_eq!(out, "abcdefghij\r\n");
        assert_eq!(d.rows(), 2);
        assert_eq!(d.cursor(), (1, 0));
    }

    // ── Row updates ─────────────────────────────────────────────────────

    #[test]
    fn append_uses_insert_char() {
        let mut d = Display::new(Capabilities::xterm(), 10);
        painted(&mut d, "", "hello", 5);
        assert_eq!(painted(&mut d, "", "hello!", 6), "\x1b[@!");
        assert_eq!(d.cursor(), (0, 6));
    }

    #[test]
    fn append_without_insert_prints_glyph() {
        let mut d = Display::new(Capabilities::dumb(), 10);
        painted(&mut d, "", "hello", 5);
        assert_eq!(painted(&mut d, "", "hello!", 6), "!");
    }

    #[test]
    fn insert_in_middle_opens_cells() {
        let mut d = Display::new(Capabilities::xterm(), 20);
        painted(&mut d, "", "helo", 3);
        assert_eq!(painted(&mut d, "", "hello", 4), "\x1b[@l");
    }

    #[test]
    fn delete_in_middle_uses_delete_char() {
        let mut d = Display::new(Capabilities::xterm(), 20);
        assert_eq!(painted(&mut d, "", "hello", 1), "hello\rh");
        assert_eq!(painted(&mut d, "", "hllo", 1), "\x1b[P");
    }

    #[test]
    fn shrink_at_end_clears_to_eol() {
        let mut d = Display::new(Capabilities::xterm(), 20);
        painted(&mut d, "", "hello", 5);
        assert_eq!(painted(&mut d, "", "hell", 4), "\x08\x1b[K");
    }

    #[test]
    fn shrink_without_ce_overprints_spaces() {
        let mut d = Display::new(Capabilities::dumb(), 20);
        painted(&mut d, "", "hello", 5);
        assert_eq!(painted(&mut d, "", "he", 2), "\x08\x08\x08   \x08\x08\x08");
    }

    #[test]
    fn replace_same_width_prints_span() {
        let mut d = Display::new(Capabilities::xterm(), 20);
        painted(&mut d, "", "cat", 3);
        assert_eq!(painted(&mut d, "", "car", 3), "\x08r");
    }

    #[test]
    fn trailing_spaces_are_repainted() {
        let mut d = Display::new(Capabilities::xterm(), 20);
        painted(&mut d, "", "a  ", 3);
        // "b" replaces "a"; the shared "  " tail is repainted too.
        assert_eq!(painted(&mut d, "", "b  ", 3), "\rb  ");
    }

    #[test]
    fn unchanged_line_only_moves_cursor() {
        let mut d = Display::new(Capabilities::xterm(), 20);
        painted(&mut d, "> ", "abc", 3);
        assert_eq!(painted(&mut d, "> ", "abc", 2), "\x08");
    }

    // ── Cursor choice ───────────────────────────────────────────────────

    #[test]
    fn carriage_return_when_shorter() {
        let mut d = Display::new(Capabilities::dumb(), 80);
        painted(&mut d, "", "abcdef", 6);
        assert_eq!(painted(&mut d, "", "abcdef", 0), "\r");
        painted(&mut d, "", "abcdef", 6);
        assert_eq!(painted(&mut d, "", "abcdef", 1), "\ra");
    }

    #[test]
    fn backspace_when_shorter() {
        let mut d = Display::new(Capabilities::dumb(), 80);
        painted(&mut d, "", "abcdef", 6);
        assert_eq!(painted(&mut d, "", "abcdef", 5), "\x08");
    }

    // ── Horizontal scrolling ───────────────────────────────────────────

    #[test]
    fn no_up_capability_keeps_one_row() {
        let mut d = Display::new(Capabilities::dumb(), 10);
        assert!(d.scrolls_horizontally());

        let first = painted(&mut d, "", "abcdefghijkl", 12);
        assert!(!first.contains('\n'));
        assert_eq!(d.rows(), 1);
        assert_eq!(d.row_text(0), "ijkl");
        assert_eq!(d.cursor(), (0, 4));

        let home = painted(&mut d, "", "abcdefghijkl", 0);
        assert!(!home.contains('\n'));
        assert_eq!(d.row_text(0), "abcdefghi");
        assert_eq!(d.cursor(), (0, 0));

        let insert = painted(&mut d, "", "Xabcdefghijkl", 1);
        assert!(!insert.contains('\n'));
        assert_eq!(d.row_text(0), "Xabcdefgh");
        assert_eq!(d.cursor(), (0, 1));
    }

    #[test]
    fn up_capability_wraps_rows() {
        let mut d = Display::new(Capabilities::xterm(), 10);
        assert!(!d.scrolls_horizontally());
        painted(&mut d, "", "abcdefghijkl", 0);
        assert_eq!(d.rows(), 2);
    }

    #[test]
    fn forward_motion_reprints() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        painted(&mut d, "", "abcdef", 0);
        assert_eq!(painted(&mut d, "", "abcdef", 3), "abc");
    }

    // ── Wrapping ────────────────────────────────────────────────────────

    #[test]
    fn wrapped_line_moves_down_with_newline() {
        let mut d = Display::new(Capabilities::xterm(), 10);
        let out = painted(&mut d, "> ", "abcdefghij", 10);
        assert_eq!(out, "> abcdefgh\r\nij");
        assert_eq!(d.cursor(), (1, 2));
    }

    #[test]
    fn moving_to_earlier_row_goes_up() {
        let mut d = Display::new(Capabilities::xterm(), 10);
        painted(&mut d, "> ", "abcdefghij", 10);
        assert_eq!(painted(&mut d, "> ", "abcdefghij", 0), "\x1b[A");
        assert_eq!(d.cursor(), (0, 2));
    }

    #[test]
    fn vanished_rows_are_cleared() {
        let mut d = Display::new(Capabilities::xterm(), 10);
        painted(&mut d, "", "abcdefghijkl", 12);
        let out = painted(&mut d, "", "abc", 3);
        assert_eq!(out, "\x1b[Ac\x1b[K\n\r\x1b[K\x1b[Aabc");
        assert_eq!(d.cursor(), (0, 3));
    }

    // ── Whole-line operations ───────────────────────────────────────────

    #[test]
    fn finish_line_leaves_fresh_row() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        painted(&mut d, "$ ", "echo", 0);
        d.finish_line();
        assert_eq!(String::from_utf8_lossy(&d.take_output()), "echo\r\n");
        assert_eq!(d.rows(), 0);
        assert_eq!(d.cursor(), (0, 0));
    }

    #[test]
    fn set_width_forces_repaint() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        painted(&mut d, "$ ", "ab", 2);
        d.set_width(40);
        assert_eq!(painted(&mut d, "$ ", "ab", 2), "\r\x1b[K$ ab");
    }

    #[test]
    fn clear_visible_then_repaint() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        painted(&mut d, "$ ", "ab", 2);
        d.clear_visible();
        assert_eq!(String::from_utf8_lossy(&d.take_output()), "\r\x1b[K");
        assert_eq!(painted(&mut d, "$ ", "ab", 2), "$ ab");
    }

    #[test]
    fn bell_styles() {
        let mut d = Display::new(Capabilities::xterm(), 80);
        d.bell(BellStyle::Audible);
        d.bell(BellStyle::None);
        d.bell(BellStyle::Visible);
        assert_eq!(d.take_output(), b"\x07\x1b[?5h\x1b[?5l".to_vec());

        let mut dumb = Display::new(Capabilities::dumb(), 80);
        dumb.bell(BellStyle::Visible);
        assert_eq!(dumb.take_output(), b"\x07".to_vec());
    }
}
