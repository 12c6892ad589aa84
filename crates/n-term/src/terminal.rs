// SPDX-License-Identifier: MIT
//
// Terminal control for one edited line at a time.
//
// Unsafe is confined to the POSIX calls: tcgetattr/tcsetattr, the
// TIOCGWINSZ ioctl, and isatty.
#![allow(unsafe_code)]
//
// The editor puts the terminal into its line-editing mode when a line
// starts and puts it back when the line is accepted, or whenever a driven
// host's handler runs. That mode differs from a full-screen raw mode:
//
//   kept    → output post-processing, ISIG (Ctrl+C still raises SIGINT),
//             the normal screen (no alternate buffer)
//   cleared → ICANON, ECHO/ECHONL, IEXTEN, CR/NL translation on input,
//             IXON (so Ctrl+S and Ctrl+Q reach the key bindings)
//
// The settings in force before prep() are restored by deprep(), on drop,
// and by a process-wide panic hook. Without the hook a panic mid-line
// would leave the shell without echo.

use std::io;
use std::sync::{Mutex, Once};

use tracing::{debug, warn};

/// Width assumed when the terminal cannot tell us.
pub const DEFAULT_WIDTH: usize = 80;

// ─── Queries ────────────────────────────────────────────────────────────────

/// Width of the terminal on stdout in columns, if stdout is a terminal.
#[cfg(unix)]
#[must_use]
pub fn screen_width() -> Option<usize> {
    let mut ws: libc::winsize = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::ioctl(libc::STDOUT_FILENO, libc::TIOCGWINSZ, &mut ws) };
    (rc == 0 && ws.ws_col > 0).then(|| usize::from(ws.ws_col))
}

#[cfg(not(unix))]
#[must_use]
pub fn screen_width() -> Option<usize> {
    None
}

/// True if stdin is a terminal.
#[cfg(unix)]
#[must_use]
pub fn is_tty() -> bool {
    unsafe { libc::isatty(libc::STDIN_FILENO) != 0 }
}

#[cfg(not(unix))]
#[must_use]
pub fn is_tty() -> bool {
    false
}

// ─── TerminalMode ───────────────────────────────────────────────────────────

/// The mode switch a line editor drives around each edited line.
pub trait TerminalMode {
    /// Switch to byte-at-a-time input without echo.
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be reconfigured.
    fn prep(&mut self) -> io::Result<()>;

    /// Restore the settings saved by [`prep`](Self::prep).
    ///
    /// # Errors
    ///
    /// Returns an error if the terminal cannot be reconfigured.
    fn deprep(&mut self) -> io::Result<()>;
}

// ─── Line-editing mode ──────────────────────────────────────────────────────

/// Turn `cooked` settings into the line-editing mode described above.
#[cfg(unix)]
fn line_editing_mode(cooked: &libc::termios) -> libc::termios {
    let mut t = *cooked;
    t.c_iflag &= !(libc::ICRNL | libc::INLCR | libc::IGNCR | libc::IXON);
    t.c_lflag &= !(libc::ECHO | libc::ECHONL | libc::ICANON | libc::IEXTEN);
    t.c_cc[libc::VMIN] = 1;
    t.c_cc[libc::VTIME] = 0;
    t
}

/// Cooked settings for the panic hook, which cannot reach the [`Terminal`].
#[cfg(unix)]
static COOKED: Mutex<Option<libc::termios>> = Mutex::new(None);

static PANIC_HOOK: Once = Once::new();

fn install_panic_hook() {
    PANIC_HOOK.call_once(|| {
        let previous = std::panic::take_hook();
        std::panic::set_hook(Box::new(move |info| {
            #[cfg(unix)]
            if let Ok(saved) = COOKED.lock() {
                if let Some(cooked) = saved.as_ref() {
                    let _ = unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSANOW, cooked) };
                }
            }
            previous(info);
        }));
    });
}

// ─── Terminal ───────────────────────────────────────────────────────────────

/// The controlling terminal on stdin.
///
/// When stdin is not a terminal, [`prep`](TerminalMode::prep) and
/// [`deprep`](TerminalMode::deprep) only track state, so piped input
/// behaves the same as typed input.
///
/// ```no_run
/// use n_term::terminal::{Terminal, TerminalMode};
///
/// let mut term = Terminal::new();
/// term.prep()?;
/// // ... read and edit a line ...
/// term.deprep()?;
/// # Ok::<(), std::io::Error>(())
/// ```
pub struct Terminal {
    #[cfg(unix)]
    cooked: Option<libc::termios>,
    width: usize,
    prepped: bool,
}

impl Terminal {
    /// A handle in cooked mode, with the width measured now.
    #[must_use]
    pub fn new() -> Self {
        Self {
            #[cfg(unix)]
            cooked: None,
            width: screen_width().unwrap_or(DEFAULT_WIDTH),
            prepped: false,
        }
    }

    /// Screen width in columns, as last measured.
    #[must_use]
    pub const fn width(&self) -> usize {
        self.width
    }

    /// Measure the width again (after a resize) and return it.
    pub fn refresh_width(&mut self) -> usize {
        if let Some(width) = screen_width() {
            self.width = width;
        }
        self.width
    }

    /// True between [`prep`](TerminalMode::prep) and
    /// [`deprep`](TerminalMode::deprep).
    #[must_use]
    pub const fn is_prepped(&self) -> bool {
        self.prepped
    }

    #[cfg(unix)]
    fn apply(&mut self) -> io::Result<()> {
        if !is_tty() {
            return Ok(());
        }
        let mut cooked: libc::termios = unsafe { std::mem::zeroed() };
        if unsafe { libc::tcgetattr(libc::STDIN_FILENO, &raw mut cooked) } != 0 {
            return Err(io::Error::last_os_error());
        }
        let editing = line_editing_mode(&cooked);
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSADRAIN, &raw const editing) } != 0 {
            return Err(io::Error::last_os_error());
        }
        self.cooked = Some(cooked);
        if let Ok(mut saved) = COOKED.lock() {
            *saved = Some(cooked);
        }
        Ok(())
    }

    #[cfg(unix)]
    fn restore(&mut self) -> io::Result<()> {
        let Some(cooked) = self.cooked.take() else {
            return Ok(());
        };
        if unsafe { libc::tcsetattr(libc::STDIN_FILENO, libc::TCSADRAIN, &raw const cooked) } != 0 {
            self.cooked = Some(cooked);
            return Err(io::Error::last_os_error());
        }
        if let Ok(mut saved) = COOKED.lock() {
            *saved = None;
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn apply(&mut self) -> io::Result<()> {
        Ok(())
    }

    #[cfg(not(unix))]
    fn restore(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Default for Terminal {
    fn default() -> Self {
        Self::new()
    }
}

impl TerminalMode for Terminal {
    fn prep(&mut self) -> io::Result<()> {
        if self.prepped {
            return Ok(());
        }
        install_panic_hook();
        self.apply()?;
        self.prepped = true;
        debug!(width = self.width, "terminal prepped");
        Ok(())
    }

    fn deprep(&mut self) -> io::Result<()> {
        if !self.prepped {
            return Ok(());
        }
        self.restore()?;
        self.prepped = false;
        debug!("terminal deprepped");
        Ok(())
    }
}

impl Drop for Terminal {
    fn drop(&mut self) {
        if let Err(e) = self.deprep() {
            warn!("restoring terminal: {e}");
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    fn cooked() -> libc::termios {
        let mut t: libc::termios = unsafe { std::mem::zeroed() };
        t.c_iflag = libc::ICRNL | libc::IXON | libc::BRKINT;
        t.c_oflag = libc::OPOST | libc::ONLCR;
        t.c_lflag = libc::ECHO | libc::ICANON | libc::ISIG | libc::IEXTEN;
        t.c_cc[libc::VMIN] = 0;
        t.c_cc[libc::VTIME] = 5;
        t
    }

    #[cfg(unix)]
    #[test]
    fn editing_mode_disables_line_discipline() {
        let t = line_editing_mode(&cooked());
        assert_eq!(t.c_lflag & (libc::ECHO | libc::ICANON | libc::IEXTEN), 0);
        assert_eq!(t.c_iflag & (libc::ICRNL | libc::IXON), 0);
        assert_eq!(t.c_cc[libc::VMIN], 1);
        assert_eq!(t.c_cc[libc::VTIME], 0);
    }

    #[cfg(unix)]
    #[test]
    fn editing_mode_keeps_signals_and_output() {
        let before = cooked();
        let t = line_editing_mode(&before);
        assert_ne!(t.c_lflag & libc::ISIG, 0);
        assert_ne!(t.c_iflag & libc::BRKINT, 0);
        assert_eq!(t.c_oflag, before.c_oflag);
    }

    #[test]
    fn width_is_never_zero() {
        let mut term = Terminal::new();
        assert!(term.width() > 0);
        assert!(term.refresh_width() > 0);
    }

    #[test]
    fn prep_and_deprep_pair_up() {
        let mut term = Terminal::new();
        term.deprep().unwrap();
        assert!(!term.is_prepped());
        term.prep().unwrap();
        term.prep().unwrap();
        assert!(term.is_prepped());
        term.deprep().unwrap();
        assert!(!term.is_prepped());
    }

    #[test]
    fn works_behind_the_trait_object() {
        let mut mode: Box<dyn TerminalMode> = Box::new(Terminal::new());
        mode.prep().unwrap();
        mode.deprep().unwrap();
    }
}
