// SPDX-License-Identifier: MIT
//
// n-term — Terminal adapter for the n-readline line editor.
//
// Everything the editor needs from the outside world and nothing more:
// raw-mode toggling, a background stdin reader, byte sources with
// timeouts, a capability table, and an output buffer that turns one
// redisplay pass into one write. The editor core never touches a file
// descriptor; it talks to these types through small traits so tests can
// script input and capture output byte for byte.
//
// Terminal control goes straight through termios and explicit capability
// strings, so tests can assert on the exact bytes a redisplay produced.

pub mod caps;
pub mod output;
pub mod reader;
pub mod source;
pub mod terminal;
