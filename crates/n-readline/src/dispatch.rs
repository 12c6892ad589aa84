//! Key dispatch — turning one byte into a command, a pending sequence, or
//! a bell.
//!
//! Dispatch looks the byte up in the current keymap and acts on the
//! binding:
//!
//! | Binding | Action |
//! |---------|--------|
//! | command | pop pending sequence levels, run it with the count and key |
//! | keymap | push a `KeySequence` context and wait for the next byte |
//! | macro | pop pending levels, queue the text ahead of all input |
//! | unbound | fall back (see below) |
//!
//! # Fallback
//!
//! When a sequence cannot be extended, the byte that failed is pushed back
//! and the pending levels unwind from the innermost out. A level whose
//! keymap has no fallback pushes its own prefix key back and goes away. The
//! first level that has one ends the unwinding: its fallback runs with that
//! level's prefix key, and the pushed-back keys are read again from top
//! level. If no level has a fallback the whole sequence aborts.
//!
//! A fallback also fires when the sequence timeout expires, which is how a
//! lone `j` still inserts itself while `jk` is bound to something else.
//!
//! # Numeric arguments
//!
//! `digit-argument` and `universal-argument` push a `NumericArgument`
//! context. Digits and a leading `-` build the value; the first other key
//! ends the argument and is dispatched from the root keymap with it.

use std::rc::Rc;

use tracing::{debug, trace};

use crate::command::{Builtin, CommandRef, Outcome};
use crate::context::{Context, KeySeq, NumericArg};
use crate::keymap::{Binding, ESC, KeymapId};
use crate::session::Session;

impl Session {
    // -- Keymap dispatch ----------------------------------------------------

    /// Dispatch `key` through `map` with numeric argument `count`.
    pub(crate) fn dispatch_in(&mut self, map: KeymapId, key: u8, count: i32) -> Outcome {
        if key >= 0x80 && self.options.convert_meta {
            let &Binding::Keymap(meta) = self.keymaps.get(map, ESC) else {
                return Outcome::Bell;
            };
            self.push_sequence(meta, map, ESC, count);
            return self.dispatch_in(meta, key & 0x7f, count);
        }

        match self.keymaps.get(map, key).clone() {
            Binding::Command(command) if command.is(Builtin::DoLowercaseVersion) => {
                let lower = key.to_ascii_lowercase();
                if lower == key {
                    self.pop_sequences();
                    return Outcome::Bell;
                }
                self.dispatch_in(map, lower, count)
            }
            Binding::Command(command) => {
                self.pop_sequences();
                self.run_command(&command, count, key)
            }
            Binding::Keymap(next) => {
                self.push_sequence(next, map, key, count);
                Outcome::Done
            }
            Binding::Macro(text) => {
                self.pop_sequences();
                self.inject(&text);
                Outcome::Done
            }
            Binding::Unbound => self.unbound(map, key, count),
        }
    }

    fn push_sequence(&mut self, map: KeymapId, parent: KeymapId, key: u8, count: i32) {
        trace!(key, "key sequence continues");
        self.contexts.push(Context::KeySequence(KeySeq {
            map,
            parent,
            key,
            count,
        }));
    }

    /// Drop every pending key sequence level from the top of the stack.
    pub(crate) fn pop_sequences(&mut self) {
        while matches!(self.contexts.last(), Some(Context::KeySequence(_))) {
            self.contexts.pop();
        }
    }

    fn unbound(&mut self, map: KeymapId, key: u8, count: i32) -> Outcome {
        if !matches!(self.contexts.last(), Some(Context::KeySequence(_))) {
            let fallback = self.keymaps.fallback(map).clone();
            if fallback.is_unbound() {
                debug!(key, "unbound key");
                return Outcome::Abort;
            }
            return self.run_binding(fallback, map, key, count);
        }
        self.push_back(key);
        self.unwind_sequences()
    }

    /// Unwind pending sequence levels until one has a fallback to run.
    fn unwind_sequences(&mut self) -> Outcome {
        while let Some(Context::KeySequence(seq)) = self.contexts.last() {
            let seq = *seq;
            let fallback = self.keymaps.fallback(seq.map).clone();
            if fallback.is_unbound() {
                self.contexts.pop();
                self.push_back(seq.key);
                continue;
            }
            debug!(key = seq.key, ?fallback, "key sequence falls back");
            self.pop_sequences();
            return self.run_binding(fallback, seq.parent, seq.key, seq.count);
        }
        debug!("key sequence has no fallback");
        Outcome::Abort
    }

    /// Run a fallback binding for `key`, which was looked up in `parent`.
    fn run_binding(&mut self, binding: Binding, parent: KeymapId, key: u8, count: i32) -> Outcome {
        match binding {
            Binding::Command(command) if command.is(Builtin::DoLowercaseVersion) => {
                let lower = key.to_ascii_lowercase();
                if lower == key {
                    Outcome::Bell
                } else {
                    self.dispatch_in(parent, lower, count)
                }
            }
            Binding::Command(command) => self.run_command(&command, count, key),
            Binding::Macro(text) => {
                self.inject(&text);
                Outcome::Done
            }
            Binding::Keymap(next) => {
                self.push_sequence(next, parent, key, count);
                Outcome::Done
            }
            Binding::Unbound => Outcome::Abort,
        }
    }

    /// The sequence timeout expired: run the pending level's fallback.
    pub(crate) fn step_timeout(&mut self) -> Outcome {
        let Some(Context::KeySequence(seq)) = self.contexts.last() else {
            return Outcome::Done;
        };
        let seq = *seq;
        let fallback = self.keymaps.fallback(seq.map).clone();
        if fallback.is_unbound() {
            return Outcome::Done;
        }
        debug!(key = seq.key, "key sequence timed out");
        self.pop_sequences();
        self.run_binding(fallback, seq.parent, seq.key, seq.count)
    }

    // -- Commands -----------------------------------------------------------

    /// Run a command, keeping the "previous command" bookkeeping that
    /// kill accumulation and `yank-pop` rely on.
    pub(crate) fn run_command(&mut self, command: &CommandRef, count: i32, key: u8) -> Outcome {
        trace!(command = command.name(), count, key, "run");
        if self.utf8.is_pending() && !command.is(Builtin::SelfInsert) {
            debug!("partial character dropped");
            self.utf8.reset();
        }
        match command {
            CommandRef::Builtin(b) if b.is_argument() => self.run_builtin(*b, count, key),
            CommandRef::Builtin(b) => {
                self.this_was_kill = false;
                let outcome = self.run_builtin(*b, count, key);
                self.last_was_kill = self.this_was_kill;
                self.last_command = Some(*b);
                outcome
            }
            CommandRef::Custom(custom) => {
                let custom = Rc::clone(custom);
                self.this_was_kill = false;
                let outcome = custom.run(self, count, key);
                self.last_was_kill = self.this_was_kill;
                self.last_command = None;
                outcome
            }
        }
    }

    // -- Numeric arguments --------------------------------------------------

    /// `digit-argument`: start an argument and feed it the invoking key.
    pub(crate) fn digit_argument(&mut self, count: i32, key: u8) -> Outcome {
        self.contexts.push(Context::NumericArgument(NumericArg::new(
            count,
            self.explicit_arg,
        )));
        self.arg_dispatch(key & 0x7f)
    }

    /// `universal-argument`: start an argument of four times the count.
    pub(crate) fn universal_argument(&mut self, count: i32) -> Outcome {
        let mut arg = NumericArg::new(count, self.explicit_arg);
        arg.value = arg.value.saturating_mul(4);
        if arg.value > NumericArg::MAX {
            return Outcome::Abort;
        }
        self.contexts.push(Context::NumericArgument(arg));
        Outcome::Done
    }

    /// Feed one key to the numeric argument on top of the stack.
    pub(crate) fn arg_dispatch(&mut self, key: u8) -> Outcome {
        let Some(Context::NumericArgument(arg)) = self.contexts.last() else {
            return Outcome::Done;
        };
        let mut arg = *arg;
        let root = self.keymaps.root();

        if arg.read_one {
            self.contexts.pop();
            self.explicit_arg = arg.explicit;
            return self.dispatch_in(root, key, arg.count());
        }

        let universal = self.keymaps.get(root, key).as_builtin() == Some(Builtin::UniversalArgument);
        let plain = key & 0x7f;
        if universal {
            if arg.saw_digit {
                arg.read_one = true;
            } else {
                arg.value = arg.value.saturating_mul(4);
            }
        } else if plain.is_ascii_digit() {
            let digit = i32::from(plain - b'0');
            arg.value = if arg.explicit {
                arg.value.saturating_mul(10).saturating_add(digit)
            } else {
                digit
            };
            arg.explicit = true;
            arg.saw_digit = true;
        } else if plain == b'-' && !arg.explicit {
            arg.value = 1;
            arg.sign = -1;
            arg.saw_minus = true;
        } else {
            if arg.saw_minus && arg.value == 1 && !arg.explicit {
                arg.explicit = true;
            }
            self.contexts.pop();
            self.explicit_arg = arg.explicit;
            trace!(count = arg.count(), "numeric argument done");
            return self.dispatch_in(root, key, arg.count());
        }

        if arg.value > NumericArg::MAX {
            debug!(value = arg.value, "numeric argument too large");
            return Outcome::Abort;
        }
        if let Some(Context::NumericArgument(slot)) = self.contexts.last_mut() {
            *slot = arg;
        }
        Outcome::Done
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
