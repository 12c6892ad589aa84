//! Word motions — emacs-style word navigation within one line.
//!
//! | Function | Default key | Stops at |
//! |----------|-------------|----------|
//! | [`forward_word`] | `M-f` | end of the current or next word |
//! | [`backward_word`] | `M-b` | start of the current or previous word |
//! | [`unix_word_start`] | `C-w` | start of the previous whitespace-delimited word |
//! | [`blank_run`] | `M-\` | the run of blanks around a position |
//! | [`transpose_targets`] | `M-t` | the two words to swap |
//!
//! # Words
//!
//! A **word** is a run of alphanumeric characters. Everything else
//! (punctuation and blanks) separates words, so `foo-bar` holds two words.
//! `C-w` is the exception: it only treats whitespace as a separator, so it
//! rubs out `foo-bar` in one go.
//!
//! All offsets are byte offsets into the line, always on char boundaries.

use std::ops::Range;

// ---------------------------------------------------------------------------
// Character classification
// ---------------------------------------------------------------------------

/// Character class for word boundary detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum CharClass {
    /// Letters and digits.
    Word,
    /// Non-blank, non-word characters (operators, brackets, etc.).
    Punctuation,
    /// Whitespace.
    Blank,
}

/// Classify a character for word motions.
pub(crate) fn classify(ch: char) -> CharClass {
    if ch.is_whitespace() {
        CharClass::Blank
    } else if ch.is_alphanumeric() {
        CharClass::Word
    } else {
        CharClass::Punctuation
    }
}

fn is_word(ch: char) -> bool {
    classify(ch) == CharClass::Word
}

fn is_blank(ch: char) -> bool {
    classify(ch) == CharClass::Blank
}

// ---------------------------------------------------------------------------
// Public API
// ---------------------------------------------------------------------------

/// `forward-word` — skip non-word characters, then the word after them.
#[must_use]
pub fn forward_word(text: &str, pos: usize) -> usize {
    let pos = skip_forward(text, pos, |c| !is_word(c));
    skip_forward(text, pos, is_word)
}

/// `backward-word` — skip non-word characters backward, then the word
/// before them.
#[must_use]
pub fn backward_word(text: &str, pos: usize) -> usize {
    let pos = skip_backward(text, pos, |c| !is_word(c));
    skip_backward(text, pos, is_word)
}

/// Start of the whitespace-delimited word before `pos` (`unix-word-rubout`).
#[must_use]
pub fn unix_word_start(text: &str, pos: usize) -> usize {
    let pos = skip_backward(text, pos, is_blank);
    skip_backward(text, pos, |c| !is_blank(c))
}

/// The run of blanks touching `pos` on either side.
#[must_use]
pub fn blank_run(text: &str, pos: usize) -> Range<usize> {
    skip_backward(text, pos, is_blank)..skip_forward(text, pos, is_blank)
}

/// The two word ranges `transpose-words` swaps: the word at or before
/// `pos`, and the word `count` words after it. `None` if there are not two
/// words.
#[must_use]
pub fn transpose_targets(
    text: &str,
    pos: usize,
    count: usize,
) -> Option<(Range<usize>, Range<usize>)> {
    let w2_end = (0..count).fold(pos, |p, _| forward_word(text, p));
    let w2_start = backward_word(text, w2_end);
    let w1_start = (0..count).fold(w2_start, |p, _| backward_word(text, p));
    let w1_end = forward_word(text, w1_start);

    if w1_start == w2_start || w2_start < w1_end {
        return None;
    }
    Some((w1_start..w1_end, w2_start..w2_end))
}

// ---------------------------------------------------------------------------
// Core algorithms
// ---------------------------------------------------------------------------

/// Advance from `pos` while `pred` holds for the next char.
fn skip_forward(text: &str, pos: usize, pred: impl Fn(char) -> bool) -> usize {
    let pos = pos.min(text.len());
    text[pos..]
        .char_indices()
        .find(|&(_, c)| !pred(c))
        .map_or(text.len(), |(i, _)| pos + i)
}

/// Retreat from `pos` while `pred` holds for the previous char.
fn skip_backward(text: &str, pos: usize, pred: impl Fn(char) -> bool) -> usize {
    let pos = pos.min(text.len());
    text[..pos]
        .char_indices()
        .rev()
        .find(|&(_, c)| !pred(c))
        .map_or(0, |(i, c)| i + c.len_utf8())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- classify -----------------------------------------------------------

    #[test]
    fn classify_word_chars() {
        assert_eq!(classify('a'), CharClass::Word);
        assert_eq!(classify('Z'), CharClass::Word);
        assert_eq!(classify('7'), CharClass::Word);
        assert_eq!(classify('é'), CharClass::Word);
    }

    #[test]
    fn classify_punctuation_and_blanks() {
        assert_eq!(classify('_'), CharClass::Punctuation);
        assert_eq!(classify('.'), CharClass::Punctuation);
        assert_eq!(classify(' '), CharClass::Blank);
        assert_eq!(classify('\t'), CharClass::Blank);
    }

    // -- forward_word -------------------------------------------------------

    #[test]
    fn forward_word_ends_at_word_end() {
        assert_eq!(forward_word("hello world", 0), 5);
        assert_eq!(forward_word("hello world", 5), 11);
    }

    #[test]
    fn forward_word_skips_punctuation() {
        assert_eq!(forward_word("foo--bar", 3), 8);
    }

    #[test]
    fn forward_word_at_end_stays() {
        assert_eq!(forward_word("abc", 3), 3);
        assert_eq!(forward_word("abc   ", 3), 6);
    }

    // -- backward_word ------------------------------------------------------

    #[test]
    fn backward_word_to_word_start() {
        assert_eq!(backward_word("hello world", 11), 6);
        assert_eq!(backward_word("hello world", 6), 0);
        assert_eq!(backward_word("hello world", 8), 6);
    }

    #[test]
    fn backward_word_at_start_stays() {
        assert_eq!(backward_word("abc", 0), 0);
    }

    #[test]
    fn multibyte_words() {
        let text = "naïve café";
        assert_eq!(forward_word(text, 0), "naïve".len());
        assert_eq!(backward_word(text, text.len()), "naïve ".len());
    }

    // -- unix_word_start ----------------------------------------------------

    #[test]
    fn unix_word_treats_punctuation_as_word() {
        assert_eq!(unix_word_start("ls foo-bar", 10), 3);
        assert_eq!(unix_word_start("ls foo-bar  ", 12), 3);
    }

    // -- blank_run ----------------------------------------------------------

    #[test]
    fn blank_run_spans_both_sides() {
        assert_eq!(blank_run("a   b", 2), 1..4);
        assert_eq!(blank_run("ab", 1), 1..1);
    }

    // -- transpose_targets --------------------------------------------------

    #[test]
    fn transpose_targets_between_words() {
        assert_eq!(transpose_targets("one two", 4, 1), Some((0..3, 4..7)));
    }

    #[test]
    fn transpose_targets_at_end_uses_last_two() {
        assert_eq!(transpose_targets("one two", 7, 1), Some((0..3, 4..7)));
    }

    #[test]
    fn transpose_targets_with_count_reaches_further() {
        assert_eq!(transpose_targets("a b c", 1, 2), Some((0..1, 4..5)));
    }

    #[test]
    fn transpose_targets_needs_two_words() {
        assert_eq!(transpose_targets("single", 3, 1), None);
        assert_eq!(transpose_targets("", 0, 1), None);
    }
}
