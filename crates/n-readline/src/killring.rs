//! Kill ring — storage for killed text.
//!
//! Every kill command (`C-k`, `M-d`, `C-w`, ...) copies the text it removes
//! into the ring. `C-y` yanks the most recent slot back; `M-y` right after a
//! yank replaces the yanked text with the next older slot, walking around
//! the ring.
//!
//! ## Consecutive kills
//!
//! Kills issued back to back build one slot instead of many: a forward kill
//! appends to the current slot, a backward kill prepends. That way
//! `M-d M-d M-d` yanks back as the three words it removed, in order. The
//! caller decides what "back to back" means (the session tracks whether
//! the previous command was a kill) and passes it as `continue_last`.

use std::collections::VecDeque;

/// Default number of slots.
pub const DEFAULT_KILL_RING_SIZE: usize = 10;

/// Which side of the current slot a continued kill joins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KillDirection {
    /// The text was after point (`kill-line`, `kill-word`): append.
    Forward,
    /// The text was before point (`backward-kill-word`): prepend.
    Backward,
}

/// A bounded ring of killed text.
#[derive(Debug, Clone)]
pub struct KillRing {
    /// Oldest first. The slot at `index` is the one `yank` inserts.
    slots: VecDeque<String>,

    /// Index of the current slot. Meaningless when `slots` is empty.
    index: usize,

    capacity: usize,
}

impl KillRing {
    /// Create an empty ring with the default capacity.
    #[must_use]
    pub const fn new() -> Self {
        Self::with_capacity(DEFAULT_KILL_RING_SIZE)
    }

    /// Create an empty ring holding at most `capacity` slots (at least one).
    #[must_use]
    pub const fn with_capacity(capacity: usize) -> Self {
        Self {
            slots: VecDeque::new(),
            index: 0,
            capacity: if capacity == 0 { 1 } else { capacity },
        }
    }

    /// Number of filled slots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// True if nothing has been killed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Store killed text.
    ///
    /// With `continue_last`, the text joins the newest slot on the side
    /// given by `dir`. Otherwise it starts a new slot, dropping the oldest
    /// when the ring is full. Either way the newest slot becomes current.
    pub fn kill(&mut self, text: &str, dir: KillDirection, continue_last: bool) {
        if text.is_empty() {
            return;
        }
        match self.slots.back_mut() {
            Some(slot) if continue_last => match dir {
                KillDirection::Forward => slot.push_str(text),
                KillDirection::Backward => slot.insert_str(0, text),
            },
            _ => {
                if self.slots.len() == self.capacity {
                    self.slots.pop_front();
                }
                self.slots.push_back(text.to_string());
            }
        }
        self.index = self.slots.len() - 1;
    }

    /// The text `yank` would insert.
    #[must_use]
    pub fn current(&self) -> Option<&str> {
        self.slots.get(self.index).map(String::as_str)
    }

    /// Step to the next older slot (wrapping to the newest) and return it.
    pub fn rotate(&mut self) -> Option<&str> {
        if self.slots.is_empty() {
            return None;
        }
        self.index = if self.index == 0 {
            self.slots.len() - 1
        } else {
            self.index - 1
        };
        self.current()
    }
}

impl Default for KillRing {
    fn default() -> Self {
        Self::new()
    }
}

// ── Tests ──────────────────────────────────────────────────────────────
