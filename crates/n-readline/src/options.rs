//! Editor variables — the inputrc `set` system.
//!
//! Variable values live on [`Options`]; this module also parses the
//! `set name value` directives an inputrc line carries. Reading whole
//! inputrc files (with `$if` blocks and key bindings) is the host's job:
//! feed each `set` line to [`Options::apply`].
//!
//! # Variables
//!
//! | Name                  | Type     | Default     |
//! |-----------------------|----------|-------------|
//! | `bell-style`          | enum     | `audible`   |
//! | `convert-meta`        | bool     | off         |
//! | `keyseq-timeout`      | ms       | 500         |
//! | `isearch-terminators` | keyseq   | `"\e\C-j"`  |
//! | `history-size`        | integer  | unlimited   |
//! | `auto-add-history`    | bool     | on          |
//!
//! Booleans accept `on`/`off`, `true`/`false` and `1`/`0` (any case). A
//! bare `set convert-meta` means on. A `keyseq-timeout` of 0 or less waits
//! forever; a negative `history-size` means unlimited.

use std::fmt;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::keymap::parse_keyseq;

/// How the bell is rung.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BellStyle {
    /// Never ring.
    None,
    /// Send the terminal bell.
    #[default]
    Audible,
    /// Flash the screen (falls back to audible when the terminal can't).
    Visible,
}

impl fmt::Display for BellStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("none"),
            Self::Audible => f.write_str("audible"),
            Self::Visible => f.write_str("visible"),
        }
    }
}

/// Every variable name [`Options::set`] understands.
pub const VARIABLES: &[&str] = &[
    "bell-style",
    "convert-meta",
    "keyseq-timeout",
    "isearch-terminators",
    "history-size",
    "auto-add-history",
];

/// The session's variables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// `bell-style`.
    pub bell_style: BellStyle,

    /// `convert-meta` — turn bytes with the eighth bit set into ESC-prefixed
    /// keys.
    pub convert_meta: bool,

    /// `keyseq-timeout` — how long to wait for the next key of an ambiguous
    /// sequence. `None` waits forever.
    pub keyseq_timeout: Option<Duration>,

    /// `isearch-terminators` — keys that end an incremental search without
    /// being executed afterwards.
    pub isearch_terminators: Vec<u8>,

    /// `history-size` — maximum history entries. `None` is unlimited.
    pub history_size: Option<usize>,

    /// `auto-add-history` — append accepted lines to the history.
    pub auto_add_history: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            bell_style: BellStyle::Audible,
            convert_meta: false,
            keyseq_timeout: Some(Duration::from_millis(500)),
            isearch_terminators: vec![0x1b, 0x0a],
            history_size: None,
            auto_add_history: true,
        }
    }
}

impl Options {
    /// Set variable `name` from its textual `value`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownVariable`] for a name not in [`VARIABLES`],
    /// [`Error::InvalidValue`] for a value the variable cannot take.
    pub fn set(&mut self, name: &str, value: &str) -> Result<()> {
        let invalid = || Error::InvalidValue {
            name: name.to_string(),
            value: value.to_string(),
        };
        let value = unquote(value.trim());

        match name {
            "bell-style" => {
                self.bell_style = match value.to_ascii_lowercase().as_str() {
                    "none" | "off" => BellStyle::None,
                    "audible" | "on" | "" => BellStyle::Audible,
                    "visible" => BellStyle::Visible,
                    _ => return Err(invalid()),
                };
            }
            "convert-meta" => self.convert_meta = parse_bool(value).ok_or_else(invalid)?,
            "auto-add-history" => self.auto_add_history = parse_bool(value).ok_or_else(invalid)?,
            "keyseq-timeout" => {
                let ms: i64 = value.parse().map_err(|_| invalid())?;
                self.keyseq_timeout = u64::try_from(ms)
                    .ok()
                    .filter(|&ms| ms > 0)
                    .map(Duration::from_millis);
            }
            "history-size" => {
                let n: i64 = value.parse().map_err(|_| invalid())?;
                self.history_size = usize::try_from(n).ok();
            }
            "isearch-terminators" => {
                self.isearch_terminators = parse_keyseq(value).map_err(|_| invalid())?;
            }
            _ => return Err(Error::UnknownVariable(name.to_string())),
        }
        Ok(())
    }

    /// The current value of `name`, formatted the way `set` accepts it.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<String> {
        let value = match name {
            "bell-style" => self.bell_style.to_string(),
            "convert-meta" => format_bool(self.convert_meta),
            "auto-add-history" => format_bool(self.auto_add_history),
            "keyseq-timeout" => self
                .keyseq_timeout
                .map_or(0, |t| t.as_millis())
                .to_string(),
            "history-size" => self
                .history_size
                .map_or_else(|| "-1".to_string(), |n| n.to_string()),
            "isearch-terminators" => format!("\"{}\"", escape_keyseq(&self.isearch_terminators)),
            _ => return None,
        };
        Some(value)
    }

    /// Apply one inputrc line. Blank lines and `#` comments are ignored.
    ///
    /// # Errors
    ///
    /// Fails like [`set`](Self::set), or with [`Error::UnknownVariable`]
    /// when the line is not a `set` directive at all.
    pub fn apply(&mut self, line: &str) -> Result<()> {
        match parse_set(line) {
            Some(SetDirective { name, value }) => self.set(&name, &value),
            None if is_blank_or_comment(line) => Ok(()),
            None => Err(Error::UnknownVariable(line.trim().to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// A parsed `set name value` line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDirective {
    /// Variable name.
    pub name: String,
    /// Raw value text (possibly empty, quotes kept).
    pub value: String,
}

/// Parse a `set name value` line. `None` for anything else.
#[must_use]
pub fn parse_set(line: &str) -> Option<SetDirective> {
    let rest = line.trim().strip_prefix("set")?;
    if !rest.starts_with(char::is_whitespace) {
        return None;
    }
    let rest = rest.trim_start();
    let (name, value) = rest
        .split_once(char::is_whitespace)
        .unwrap_or((rest, ""));
    if name.is_empty() {
        return None;
    }
    Some(SetDirective {
        name: name.to_string(),
        value: value.trim().to_string(),
    })
}

/// Parse an inputrc boolean. A missing value means on.
#[must_use]
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "" | "on" | "true" | "1" => Some(true),
        "off" | "false" | "0" => Some(false),
        _ => None,
    }
}

fn format_bool(value: bool) -> String {
    if value { "on" } else { "off" }.to_string()
}

fn is_blank_or_comment(line: &str) -> bool {
    let line = line.trim();
    line.is_empty() || line.starts_with('#')
}

fn unquote(value: &str) -> &str {
    value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
        .unwrap_or(value)
}

/// Render bytes back into key-sequence notation.
fn escape_keyseq(bytes: &[u8]) -> String {
    let mut out = String::new();
    for &b in bytes {
        match b {
            0x1b => out.push_str("\\e"),
            0x7f => out.push_str("\\C-?"),
            b'\\' => out.push_str("\\\\"),
            b'"' => out.push_str("\\\""),
            0..=0x1f => {
                out.push_str("\\C-");
                out.push(char::from(b + 0x60));
            }
            0x20..=0x7e => out.push(char::from(b)),
            _ => out.push_str(&format!("\\x{b:02x}")),
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // ── parse_set ─────────────────────────────────────────────────────────

    #[test]
    fn parse_name_and_value() {
        assert_eq!(
            parse_set("set bell-style visible"),
            Some(SetDirective {
                name: "bell-style".into(),
                value: "visible".into()
            })
        );
    }

    #[test]
    fn parse_bare_name() {
        assert_eq!(
            parse_set("  set convert-meta  "),
            Some(SetDirective {
                name: "convert-meta".into(),
                value: String::new()
            })
        );
    }

    #[test]
    fn parse_rejects_other_lines() {
        assert_eq!(parse_set("\"\\C-x\": abort"), None);
        assert_eq!(parse_set("settings on"), None);
        assert_eq!(parse_set("set"), None);
    }

    #[test]
    fn bools() {
        assert_eq!(parse_bool("On"), Some(true));
        assert_eq!(parse_bool("0"), Some(false));
        assert_eq!(parse_bool(""), Some(true));
        assert_eq!(parse_bool("maybe"), None);
    }

    // ── Options::set ──────────────────────────────────────────────────────

    #[test]
    fn defaults() {
        let o = Options::default();
        assert_eq!(o.bell_style, BellStyle::Audible);
        assert!(!o.convert_meta);
        assert_eq!(o.keyseq_timeout, Some(Duration::from_millis(500)));
        assert_eq!(o.isearch_terminators, b"\x1b\n".to_vec());
        assert_eq!(o.history_size, None);
        assert!(o.auto_add_history);
    }

    #[test]
    fn set_each_variable() {
        let mut o = Options::default();
        o.set("bell-style", "none").unwrap();
        o.set("convert-meta", "on").unwrap();
        o.set("keyseq-timeout", "0").unwrap();
        o.set("isearch-terminators", "\"\\C-g\\C-m\"").unwrap();
        o.set("history-size", "100").unwrap();
        o.set("auto-add-history", "off").unwrap();

        assert_eq!(o.bell_style, BellStyle::None);
        assert!(o.convert_meta);
        assert_eq!(o.keyseq_timeout, None);
        assert_eq!(o.isearch_terminators, vec![0x07, 0x0d]);
        assert_eq!(o.history_size, Some(100));
        assert!(!o.auto_add_history);
    }

    #[test]
    fn negative_history_size_is_unlimited() {
        let mut o = Options::default();
        o.set("history-size", "10").unwrap();
        o.set("history-size", "-1").unwrap();
        assert_eq!(o.history_size, None);
    }

    #[test]
    fn unknown_variable() {
        let mut o = Options::default();
        assert!(matches!(
            o.set("enable-meta-key", "on"),
            Err(Error::UnknownVariable(name)) if name == "enable-meta-key"
        ));
    }

    #[test]
    fn invalid_values() {
        let mut o = Options::default();
        assert!(matches!(
            o.set("bell-style", "loud"),
            Err(Error::InvalidValue { .. })
        ));
        assert!(o.set("keyseq-timeout", "soon").is_err());
        assert!(o.set("convert-meta", "yes please").is_err());
        assert_eq!(o, Options::default());
    }

    // ── apply / get ───────────────────────────────────────────────────────

    #[test]
    fn apply_lines() {
        let mut o = Options::default();
        o.apply("# comment").unwrap();
        o.apply("").unwrap();
        o.apply("set keyseq-timeout 250").unwrap();
        assert_eq!(o.keyseq_timeout, Some(Duration::from_millis(250)));
        assert!(o.apply("bind -x").is_err());
    }

    #[test]
    fn get_formats_like_set() {
        let o = Options::default();
        assert_eq!(o.get("bell-style").as_deref(), Some("audible"));
        assert_eq!(o.get("convert-meta").as_deref(), Some("off"));
        assert_eq!(o.get("keyseq-timeout").as_deref(), Some("500"));
        assert_eq!(o.get("history-size").as_deref(), Some("-1"));
        assert_eq!(o.get("isearch-terminators").as_deref(), Some("\"\\e\\C-j\""));
        assert_eq!(o.get("nope"), None);
    }

    #[test]
    fn get_then_set_round_trips() {
        let mut o = Options::default();
        for name in VARIABLES {
            let value = o.get(name).unwrap();
            o.set(name, &value).unwrap();
        }
        assert_eq!(o, Options::default());
    }
}
