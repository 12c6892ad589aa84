//! Keymaps — byte-indexed binding tables, nested for multi-key sequences.
//!
//! A [`Keymap`] has one [`Binding`] slot per byte value plus a **fallback**
//! slot, consulted when a key sequence through this map cannot be
//! completed. Nested maps live in one arena ([`Keymaps`]) and refer to each
//! other by [`KeymapId`], so a keymap graph is plain owned data.
//!
//! # Key sequence notation
//!
//! [`parse_keyseq`] understands the inputrc notation:
//!
//! | Notation | Bytes |
//! |----------|-------|
//! | `\C-x` | control-x (`\C-?` is DEL) |
//! | `\M-x` | ESC, then x |
//! | `\e` | ESC |
//! | `\\`, `\"`, `\'` | the character itself |
//! | `\a \b \d \f \n \r \t \v` | BEL, BS, DEL, FF, LF, CR, TAB, VT |
//! | `\NNN` | octal byte (1–3 digits) |
//! | `\xHH` | hex byte (1–2 digits) |
//!
//! # Shadowed prefixes
//!
//! Binding `"jk"` when `j` already runs `self-insert` turns `j` into a
//! prefix. The displaced binding moves into the new map's fallback slot, so
//! `j` followed by anything other than `k` still inserts the `j`.

use std::rc::Rc;

use crate::command::{Builtin, CommandRef};
use crate::error::{Error, Result};

/// The escape byte.
pub const ESC: u8 = 0x1b;

/// The delete byte.
pub const DEL: u8 = 0x7f;

/// The control version of an ASCII key (`ctrl(b'a') == 1`).
#[must_use]
pub const fn ctrl(key: u8) -> u8 {
    if key == b'?' { DEL } else { key & 0x1f }
}

// ---------------------------------------------------------------------------
// Binding
// ---------------------------------------------------------------------------

/// Index of a keymap in a [`Keymaps`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KeymapId(usize);

/// What a key (or the fallback slot) is bound to.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Binding {
    /// Nothing.
    #[default]
    Unbound,
    /// Run a command.
    Command(CommandRef),
    /// The key is a prefix: continue in this map.
    Keymap(KeymapId),
    /// Replay these bytes as if typed.
    Macro(Rc<[u8]>),
}

impl Binding {
    /// A binding to a built-in function.
    #[must_use]
    pub const fn builtin(b: Builtin) -> Self {
        Self::Command(CommandRef::Builtin(b))
    }

    /// A macro binding.
    #[must_use]
    pub fn macro_text(bytes: &[u8]) -> Self {
        Self::Macro(Rc::from(bytes))
    }

    /// True for [`Binding::Unbound`].
    #[must_use]
    pub const fn is_unbound(&self) -> bool {
        matches!(self, Self::Unbound)
    }

    /// The built-in this binding runs, if it is one.
    #[must_use]
    pub const fn as_builtin(&self) -> Option<Builtin> {
        match self {
            Self::Command(CommandRef::Builtin(b)) => Some(*b),
            _ => None,
        }
    }
}

impl From<Builtin> for Binding {
    fn from(b: Builtin) -> Self {
        Self::builtin(b)
    }
}

// ---------------------------------------------------------------------------
// Keymap
// ---------------------------------------------------------------------------

/// One binding table.
#[derive(Debug, Clone)]
pub struct Keymap {
    slots: Vec<Binding>,
    fallback: Binding,
}

impl Keymap {
    /// A map with every key unbound and no fallback.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: vec![Binding::Unbound; 256],
            fallback: Binding::Unbound,
        }
    }

    /// The binding for `key`.
    #[must_use]
    pub fn get(&self, key: u8) -> &Binding {
        &self.slots[usize::from(key)]
    }

    /// The fallback binding.
    #[must_use]
    pub const fn fallback(&self) -> &Binding {
        &self.fallback
    }
}

impl Default for Keymap {
    fn default() -> Self {
        Self::new()
    }
}

// ---------------------------------------------------------------------------
// Keymaps
// ---------------------------------------------------------------------------

/// An arena of keymaps with one designated root.
#[derive(Debug, Clone)]
pub struct Keymaps {
    maps: Vec<Keymap>,
    root: KeymapId,
}

impl Keymaps {
    /// An arena holding a single empty root map.
    #[must_use]
    pub fn new() -> Self {
        Self {
            maps: vec![Keymap::new()],
            root: KeymapId(0),
        }
    }

    /// The map top-level dispatch starts in.
    #[must_use]
    pub const fn root(&self) -> KeymapId {
        self.root
    }

    /// Add an empty map and return its id.
    pub fn add(&mut self) -> KeymapId {
        self.maps.push(Keymap::new());
        KeymapId(self.maps.len() - 1)
    }

    /// The map with id `id`.
    #[must_use]
    pub fn map(&self, id: KeymapId) -> &Keymap {
        &self.maps[id.0]
    }

    /// The binding for `key` in `map`.
    #[must_use]
    pub fn get(&self, map: KeymapId, key: u8) -> &Binding {
        self.maps[map.0].get(key)
    }

    /// The fallback slot of `map`.
    #[must_use]
    pub fn fallback(&self, map: KeymapId) -> &Binding {
        self.maps[map.0].fallback()
    }

    /// Bind a single key.
    pub fn bind(&mut self, map: KeymapId, key: u8, binding: impl Into<Binding>) {
        self.maps[map.0].slots[usize::from(key)] = binding.into();
    }

    /// Set the fallback slot of `map`.
    pub fn set_fallback(&mut self, map: KeymapId, binding: impl Into<Binding>) {
        self.maps[map.0].fallback = binding.into();
    }

    /// Bind a whole key sequence, creating nested maps as needed.
    ///
    /// A command or macro that sat on a prefix key moves into the new
    /// nested map's fallback. Binding a non-keymap to a key that is already
    /// a prefix sets that prefix map's fallback instead of destroying it.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidKeySequence`] if `seq` is empty.
    pub fn bind_keyseq(&mut self, map: KeymapId, seq: &[u8], binding: Binding) -> Result<()> {
        let Some((&last, prefix)) = seq.split_last() else {
            return Err(Error::InvalidKeySequence {
                seq: String::new(),
                reason: "empty key sequence",
            });
        };

        let mut cur = map;
        for &key in prefix {
            cur = match self.get(cur, key).clone() {
                Binding::Keymap(next) => next,
                displaced => {
                    let next = self.add();
                    self.set_fallback(next, displaced);
                    self.bind(cur, key, Binding::Keymap(next));
                    next
                }
            };
        }

        match (self.get(cur, last).clone(), &binding) {
            (Binding::Keymap(next), b) if !matches!(b, Binding::Keymap(_)) => {
                self.set_fallback(next, binding);
            }
            _ => self.bind(cur, last, binding),
        }
        Ok(())
    }

    /// Follow `seq` from `map` and return the final binding.
    ///
    /// Returns `None` if the walk leaves the keymap graph early.
    #[must_use]
    pub fn resolve(&self, map: KeymapId, seq: &[u8]) -> Option<&Binding> {
        let (&last, prefix) = seq.split_last()?;
        let mut cur = map;
        for &key in prefix {
            match self.get(cur, key) {
                Binding::Keymap(next) => cur = *next,
                _ => return None,
            }
        }
        Some(self.get(cur, last))
    }

    /// The standard emacs bindings, including the ESC and C-x maps and the
    /// ANSI cursor-key sequences.
    #[must_use]
    pub fn emacs() -> Self {
        use Builtin as B;

        let mut km = Self::new();
        let root = km.root();

        for key in 0x20..=0x7e {
            km.bind(root, key, B::SelfInsert);
        }
        for key in 0x80..=0xff {
            km.bind(root, key, B::SelfInsert);
        }

        let control = [
            (b'@', B::SetMark),
            (b'a', B::BeginningOfLine),
            (b'b', B::BackwardChar),
            (b'd', B::EndOfFile),
            (b'e', B::EndOfLine),
            (b'f', B::ForwardChar),
            (b'g', B::Abort),
            (b'h', B::BackwardDeleteChar),
            (b'i', B::TabInsert),
            (b'j', B::AcceptLine),
            (b'k', B::KillLine),
            (b'l', B::ClearScreen),
            (b'm', B::AcceptLine),
            (b'n', B::NextHistory),
            (b'p', B::PreviousHistory),
            (b'q', B::QuotedInsert),
            (b'r', B::ReverseSearchHistory),
            (b's', B::ForwardSearchHistory),
            (b't', B::TransposeChars),
            (b'u', B::UnixLineDiscard),
            (b'v', B::QuotedInsert),
            (b'w', B::UnixWordRubout),
            (b'y', B::Yank),
            (b'_', B::Undo),
        ];
        for (key, b) in control {
            km.bind(root, ctrl(key), b);
        }
        km.bind(root, DEL, B::BackwardDeleteChar);

        // ESC (meta) map.
        let meta = km.add();
        km.bind(root, ESC, Binding::Keymap(meta));
        let meta_keys = [
            (ctrl(b'g'), B::Abort),
            (ctrl(b'h'), B::BackwardKillWord),
            (ctrl(b'i'), B::TabInsert),
            (ctrl(b'r'), B::RevertLine),
            (b' ', B::SetMark),
            (b'-', B::DigitArgument),
            (b'<', B::BeginningOfHistory),
            (b'>', B::EndOfHistory),
            (b'\\', B::DeleteHorizontalSpace),
            (b'b', B::BackwardWord),
            (b'c', B::CapitalizeWord),
            (b'd', B::KillWord),
            (b'f', B::ForwardWord),
            (b'l', B::DowncaseWord),
            (b'n', B::NonIncrementalForwardSearchHistory),
            (b'p', B::NonIncrementalReverseSearchHistory),
            (b'r', B::RevertLine),
            (b't', B::TransposeWords),
            (b'u', B::UpcaseWord),
            (b'y', B::YankPop),
            (DEL, B::BackwardKillWord),
        ];
        for (key, b) in meta_keys {
            km.bind(meta, key, b);
        }
        for key in b'0'..=b'9' {
            km.bind(meta, key, B::DigitArgument);
        }
        for key in b'A'..=b'Z' {
            km.bind(meta, key, B::DoLowercaseVersion);
        }

        // C-x map.
        let ctlx = km.add();
        km.bind(root, ctrl(b'x'), Binding::Keymap(ctlx));
        let ctlx_keys = [
            (ctrl(b'g'), B::Abort),
            (ctrl(b'u'), B::Undo),
            (ctrl(b'x'), B::ExchangePointAndMark),
            (b'(', B::StartKbdMacro),
            (b')', B::EndKbdMacro),
            (b'e', B::CallLastKbdMacro),
            (DEL, B::BackwardKillLine),
        ];
        for (key, b) in ctlx_keys {
            km.bind(ctlx, key, b);
        }

        // Cursor keys, in both normal (CSI) and application (SS3) mode.
        let arrows = [
            (b'A', B::PreviousHistory),
            (b'B', B::NextHistory),
            (b'C', B::ForwardChar),
            (b'D', B::BackwardChar),
            (b'H', B::BeginningOfLine),
            (b'F', B::EndOfLine),
        ];
        for intro in [b'[', b'O'] {
            for (key, b) in arrows {
                // Cannot fail: the sequence is three bytes long.
                let _ = km.bind_keyseq(root, &[ESC, intro, key], b.into());
            }
        }
        let _ = km.bind_keyseq(root, b"\x1b[3~", B::DeleteChar.into());

        km
    }
}

impl Default for Keymaps {
    fn default() -> Self {
        Self::emacs()
    }
}

// ---------------------------------------------------------------------------
// Key sequence notation
// ---------------------------------------------------------------------------

/// Parse inputrc key-sequence notation into raw bytes.
///
/// # Errors
///
/// Returns [`Error::InvalidKeySequence`] for an empty sequence, a dangling
/// backslash or modifier, or `\x` without hex digits.
pub fn parse_keyseq(seq: &str) -> Result<Vec<u8>> {
    let invalid = |reason| Error::InvalidKeySequence {
        seq: seq.to_string(),
        reason,
    };

    let bytes = seq.as_bytes();
    if bytes.is_empty() {
        return Err(invalid("empty key sequence"));
    }

    let mut out = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        out.extend(parse_key(bytes, &mut i).map_err(invalid)?);
    }
    Ok(out)
}

/// Parse one key (with any `\C-`/`\M-` modifiers) starting at `*i`.
fn parse_key(bytes: &[u8], i: &mut usize) -> std::result::Result<Vec<u8>, &'static str> {
    let rest = &bytes[*i..];
    if rest.first() != Some(&b'\\') {
        *i += 1;
        return Ok(vec![rest[0]]);
    }

    if rest.starts_with(b"\\C-") {
        *i += 3;
        if *i >= bytes.len() {
            return Err("missing key after \\C-");
        }
        let mut key = parse_key(bytes, i)?;
        if let Some(last) = key.last_mut() {
            *last = ctrl(*last);
        }
        return Ok(key);
    }

    if rest.starts_with(b"\\M-") {
        *i += 3;
        if *i >= bytes.len() {
            return Err("missing key after \\M-");
        }
        let mut key = parse_key(bytes, i)?;
        key.insert(0, ESC);
        return Ok(key);
    }

    let Some(&c) = rest.get(1) else {
        return Err("trailing backslash");
    };
    *i += 2;
    let byte = match c {
        b'e' => ESC,
        b'a' => 0x07,
        b'b' => 0x08,
        b'd' => DEL,
        b'f' => 0x0c,
        b'n' => b'\n',
        b'r' => b'\r',
        b't' => b'\t',
        b'v' => 0x0b,
        b'0'..=b'7' => {
            let mut value = u32::from(c - b'0');
            for _ in 0..2 {
                match bytes.get(*i) {
                    Some(&d @ b'0'..=b'7') => {
                        value = value * 8 + u32::from(d - b'0');
                        *i += 1;
                    }
                    _ => break,
                }
            }
            // Three octal digits can exceed a byte; keep the low eight bits.
            (value & 0xff) as u8
        }
        b'x' => {
            let mut value = 0u8;
            let mut digits = 0;
            while digits < 2 {
                match bytes.get(*i).and_then(|&d| char::from(d).to_digit(16)) {
                    Some(d) => {
                        value = value * 16 + d as u8;
                        *i += 1;
                        digits += 1;
                    }
                    None => break,
                }
            }
            if digits == 0 {
                return Err("\\x needs hex digits");
            }
            value
        }
        // `\\`, `\"`, `\'` and any other escaped character stand for
        // themselves.
        other => other,
    };
    Ok(vec![byte])
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // -- parse_keyseq -------------------------------------------------------

    #[test]
    fn plain_keys() {
        assert_eq!(parse_keyseq("ab").unwrap(), b"ab".to_vec());
    }

    #[test]
    fn control_and_meta() {
        assert_eq!(parse_keyseq("\\C-a").unwrap(), vec![1]);
        assert_eq!(parse_keyseq("\\C-?").unwrap(), vec![DEL]);
        assert_eq!(parse_keyseq("\\M-f").unwrap(), vec![ESC, b'f']);
        assert_eq!(parse_keyseq("\\M-\\C-h").unwrap(), vec![ESC, 8]);
        assert_eq!(parse_keyseq("\\C-x\\C-u").unwrap(), vec![0x18, 0x15]);
    }

    #[test]
    fn escapes() {
        assert_eq!(
            parse_keyseq("\\e[A").unwrap(),
            vec![ESC, b'[', b'A']
        );
        assert_eq!(
            parse_keyseq("\\\\\\\"\\t\\n\\r\\d").unwrap(),
            vec![b'\\', b'"', b'\t', b'\n', b'\r', DEL]
        );
    }

    #[test]
    fn numeric_escapes() {
        assert_eq!(parse_keyseq("\\033").unwrap(), vec![ESC]);
        assert_eq!(parse_keyseq("\\x1b").unwrap(), vec![ESC]);
        assert_eq!(parse_keyseq("\\x7").unwrap(), vec![7]);
        assert_eq!(parse_keyseq("\\0x").unwrap(), vec![0, b'x']);
    }

    #[test]
    fn malformed_sequences() {
        assert!(parse_keyseq("").is_err());
        assert!(parse_keyseq("a\\").is_err());
        assert!(parse_keyseq("\\C-").is_err());
        assert!(parse_keyseq("\\xg").is_err());
    }

    // -- bind_keyseq --------------------------------------------------------

    #[test]
    fn bind_creates_nested_maps() {
        let mut km = Keymaps::new();
        let root = km.root();
        km.bind_keyseq(root, b"ab", Builtin::Undo.into()).unwrap();
        assert!(matches!(km.get(root, b'a'), Binding::Keymap(_)));
        assert_eq!(km.resolve(root, b"ab"), Some(&Binding::builtin(Builtin::Undo)));
    }

    #[test]
    fn shadowed_command_moves_to_fallback() {
        let mut km = Keymaps::new();
        let root = km.root();
        km.bind(root, b'j', Builtin::SelfInsert);
        km.bind_keyseq(root, b"jk", Builtin::Abort.into()).unwrap();

        let Binding::Keymap(nested) = km.get(root, b'j').clone() else {
            panic!("j should be a prefix");
        };
        assert_eq!(km.fallback(nested), &Binding::builtin(Builtin::SelfInsert));
    }

    #[test]
    fn binding_onto_prefix_sets_fallback() {
        let mut km = Keymaps::new();
        let root = km.root();
        km.bind_keyseq(root, b"ab", Builtin::Undo.into()).unwrap();
        km.bind_keyseq(root, b"a", Builtin::Yank.into()).unwrap();

        let Binding::Keymap(nested) = km.get(root, b'a').clone() else {
            panic!("a should still be a prefix");
        };
        assert_eq!(km.fallback(nested), &Binding::builtin(Builtin::Yank));
        assert_eq!(km.resolve(root, b"ab"), Some(&Binding::builtin(Builtin::Undo)));
    }

    #[test]
    fn empty_keyseq_rejected() {
        let mut km = Keymaps::new();
        let root = km.root();
        assert!(km.bind_keyseq(root, b"", Binding::Unbound).is_err());
    }

    // -- emacs defaults -----------------------------------------------------

    #[test]
    fn emacs_basics() {
        let km = Keymaps::emacs();
        let root = km.root();
        assert_eq!(km.get(root, b'x'), &Binding::builtin(Builtin::SelfInsert));
        assert_eq!(km.get(root, ctrl(b'a')), &Binding::builtin(Builtin::BeginningOfLine));
        assert_eq!(
            km.resolve(root, b"\x1bf"),
            Some(&Binding::builtin(Builtin::ForwardWord))
        );
        assert_eq!(
            km.resolve(root, b"\x18\x15"),
            Some(&Binding::builtin(Builtin::Undo))
        );
    }

    #[test]
    fn emacs_cursor_keys() {
        let km = Keymaps::emacs();
        let root = km.root();
        assert_eq!(
            km.resolve(root, b"\x1b[A"),
            Some(&Binding::builtin(Builtin::PreviousHistory))
        );
        assert_eq!(
            km.resolve(root, b"\x1bOD"),
            Some(&Binding::builtin(Builtin::BackwardChar))
        );
        assert_eq!(
            km.resolve(root, b"\x1b[3~"),
            Some(&Binding::builtin(Builtin::DeleteChar))
        );
    }

    #[test]
    fn emacs_meta_uppercase_lowers() {
        let km = Keymaps::emacs();
        assert_eq!(
            km.resolve(km.root(), b"\x1bF"),
            Some(&Binding::builtin(Builtin::DoLowercaseVersion))
        );
    }
}
