// SPDX-License-Identifier: MIT
//
// n-repl — a small echo REPL built on the n-readline line editor.
//
// It exists to exercise the editor against a real terminal in both of its
// host modes:
//
//   blocking → a stdin reader thread feeds a ChannelSource, and each
//              read_line_blocking() call returns one line
//   driven   → the host owns the loop: it waits on the chunk channel
//              (with the editor's key sequence deadline as the timeout)
//              and hands every chunk to drive_one_step(); finished lines
//              arrive in the installed handler
//
// Every accepted line is echoed back. `:history` lists the history,
// `exit` or EOF on an empty line quits.
//
// Logging goes to a file, never to the terminal the editor is drawing on.
// Set N_REPL_LOG to an env-filter directive (e.g. `n_readline=trace`) to
// see what the dispatcher is doing.

use std::fs::File;
use std::path::PathBuf;
use std::process;
use std::sync::Mutex;
use std::sync::mpsc::{Receiver, RecvTimeoutError};

use clap::Parser;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use n_readline::{Line, Session, State};
use n_term::reader::StdinReader;
use n_term::source::ChannelSource;
use n_term::terminal::{self, Terminal};

// ─── Command line ───────────────────────────────────────────────────────────

/// Echo lines typed at an Emacs-style line editor.
#[derive(Debug, Parser)]
#[command(name = "n-repl", version)]
struct Args {
    /// Prompt shown before each line.
    #[arg(long, default_value = "n-repl> ")]
    prompt: String,

    /// Let the REPL own the event loop and feed the editor as input
    /// arrives, instead of blocking inside the editor.
    #[arg(long)]
    driven: bool,

    /// Editor variable assignments, as in an inputrc `set` line
    /// (e.g. `--set "bell-style visible"`). May be repeated.
    #[arg(long = "set", value_name = "NAME VALUE")]
    settings: Vec<String>,

    /// Read `set` lines from this file before starting.
    #[arg(long)]
    inputrc: Option<PathBuf>,

    /// Where to write the log (default: n-repl.log in the current
    /// directory). Only used when N_REPL_LOG is set.
    #[arg(long)]
    log_file: Option<PathBuf>,
}

// ─── Logging ────────────────────────────────────────────────────────────────

fn init_logging(path: Option<PathBuf>) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let Ok(directive) = std::env::var("N_REPL_LOG") else {
        return Ok(());
    };
    let path = path.unwrap_or_else(|| PathBuf::from("n-repl.log"));
    let file = File::create(&path)?;
    tracing_subscriber::fmt()
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_env_filter(EnvFilter::new(directive))
        .try_init()?;
    info!(log = %path.display(), "logging started");
    Ok(())
}

// ─── Setup ──────────────────────────────────────────────────────────────────

fn configure(session: &mut Session, args: &Args) -> Result<(), String> {
    if let Some(path) = &args.inputrc {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("{}: {e}", path.display()))?;
        for (n, line) in text.lines().enumerate() {
            session
                .apply_setting(line)
                .map_err(|e| format!("{}:{}: {e}", path.display(), n + 1))?;
        }
    }
    for setting in &args.settings {
        session
            .apply_setting(&format!("set {setting}"))
            .map_err(|e| format!("--set {setting}: {e}"))?;
    }
    Ok(())
}

/// React to one accepted line. Returns `false` when the REPL should stop.
fn respond(session: &Session, text: &str) -> bool {
    match text.trim() {
        "exit" | "quit" => false,
        ":history" => {
            for (i, entry) in session.history().entries().iter().enumerate() {
                println!("{:>4}  {}", i + 1, entry.line);
            }
            true
        }
        _ => {
            println!("=> {text}");
            true
        }
    }
}

// ─── Host loops ─────────────────────────────────────────────────────────────

fn run_blocking(session: &mut Session, prompt: &str, rx: Receiver<Vec<u8>>) -> n_readline::Result<()> {
    let mut source = ChannelSource::new(rx);
    loop {
        match session.read_line_blocking(prompt, &mut source)? {
            Line::Text(text) => {
                if !respond(session, &text) {
                    return Ok(());
                }
            }
            Line::Eof => return Ok(()),
        }
    }
}

fn run_driven(session: &mut Session, prompt: &str, rx: &Receiver<Vec<u8>>) -> n_readline::Result<()> {
    session.install_handler(prompt, |session, line| {
        let keep_going = match line {
            Line::Text(text) => respond(session, &text),
            Line::Eof => false,
        };
        if !keep_going {
            if let Err(e) = session.remove_handler() {
                error!("removing line handler: {e}");
            }
        }
    })?;

    while session.state().contains(State::CALLBACK) {
        let chunk = match session.pending_timeout() {
            Some(timeout) => match rx.recv_timeout(timeout) {
                Ok(bytes) => Some(bytes),
                Err(RecvTimeoutError::Timeout) => {
                    debug!("key sequence timeout");
                    session.drive_timeout()?;
                    continue;
                }
                Err(RecvTimeoutError::Disconnected) => None,
            },
            None => rx.recv().ok(),
        };
        match chunk {
            Some(bytes) => session.drive_one_step(&bytes)?,
            None => session.drive_eof()?,
        }
    }
    Ok(())
}

// ─── Main ───────────────────────────────────────────────────────────────────

fn main() {
    let args = Args::parse();

    if let Err(e) = init_logging(args.log_file.clone()) {
        eprintln!("n-repl: logging disabled: {e}");
    }

    let mut session = Session::new(std::io::stdout());
    if let Err(e) = configure(&mut session, &args) {
        eprintln!("n-repl: {e}");
        process::exit(2);
    }

    if terminal::is_tty() {
        let term = Terminal::new();
        session.set_screen_width(term.width());
        session.set_terminal_mode(term);
    }

    let (mut reader, rx) = StdinReader::spawn().unwrap_or_else(|e| {
        eprintln!("n-repl: failed to start stdin reader: {e}");
        process::exit(1);
    });

    info!(driven = args.driven, "starting");
    let result = if args.driven {
        run_driven(&mut session, &args.prompt, &rx)
    } else {
        run_blocking(&mut session, &args.prompt, rx)
    };
    reader.stop();

    if let Err(e) = result {
        error!("{e}");
        eprintln!("n-repl: {e}");
        process::exit(1);
    }
}
