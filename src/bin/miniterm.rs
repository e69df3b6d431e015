//! miniterm
//!
//! Terminal emulator entry point. Sets up the display and the shell
//! session, runs the keyboard forwarder on a side thread and the render
//! loop on this one, and tears both down in order on every exit path so
//! the hosting terminal is always left usable.

use std::error::Error;
use std::fs::OpenOptions;
use std::path::Path;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use miniterm::input::forward_keys;
use miniterm::pty::{ChildExit, ChildWatcher, Session, WindowSize};
use miniterm::render::{Backend, TerminalBackend};
use miniterm::term::Term;

/// How long one read cycle waits for shell output before servicing the
/// quit flag and the child watcher
const READ_INTERVAL: Duration = Duration::from_millis(50);

const LOG_FILE: &str = ".miniterm.log";

/// Why the render loop stopped
enum Outcome {
    /// Ctrl-Q
    Quit,
    /// The shell exited or was killed
    Child(ChildExit),
    /// Master hit end-of-file but no exit status surfaced
    SessionClosed,
}

fn main() -> ExitCode {
    init_logging();

    let mut backend = match TerminalBackend::new() {
        Ok(backend) => backend,
        Err(e) => {
            eprintln!("miniterm: failed to set up display: {e}");
            return ExitCode::FAILURE;
        },
    };
    let size = WindowSize::new(backend.cols(), backend.rows());

    let session = match Session::spawn_shell(size) {
        Ok(session) => Arc::new(session),
        Err(e) => {
            backend.restore();
            eprintln!("miniterm: failed to start shell: {e}");
            return ExitCode::FAILURE;
        },
    };
    tracing::info!(
        pid = session.child_pid().as_raw(),
        cols = size.cols,
        rows = size.rows,
        "session started"
    );
    let mut watcher = session.watch_child();

    let quit = Arc::new(AtomicBool::new(false));
    let stop = Arc::new(AtomicBool::new(false));
    let input_thread = {
        let session = Arc::clone(&session);
        let quit = Arc::clone(&quit);
        let stop = Arc::clone(&stop);
        thread::spawn(move || forward_keys(&session, &quit, &stop))
    };

    let result = run_render_loop(&session, &mut watcher, &quit, &mut backend, size);

    // Teardown order matters: unblock the forwarder, join it, then give
    // the hosting terminal back before printing anything
    stop.store(true, Ordering::Relaxed);
    if input_thread.join().is_err() {
        tracing::error!("input thread panicked");
    }
    backend.restore();

    match result {
        Ok(Outcome::Quit) => {
            tracing::info!("closed by quit chord");
            ExitCode::SUCCESS
        },
        Ok(Outcome::Child(exit)) => {
            tracing::info!(%exit, "shell finished");
            if exit.success() {
                ExitCode::SUCCESS
            } else {
                eprintln!("miniterm: shell {exit}");
                ExitCode::FAILURE
            }
        },
        Ok(Outcome::SessionClosed) => {
            tracing::info!("session closed");
            ExitCode::SUCCESS
        },
        Err(e) => {
            tracing::error!(error = %e, "render loop failed");
            eprintln!("miniterm: {e}");
            ExitCode::FAILURE
        },
    }
}

/// Read shell output, interpret it, and keep the display current. Returns
/// once the quit chord is seen, the child exits, or the session fails.
fn run_render_loop(
    session: &Session,
    watcher: &mut ChildWatcher,
    quit: &AtomicBool,
    backend: &mut TerminalBackend,
    size: WindowSize,
) -> Result<Outcome, Box<dyn Error>> {
    let mut term = Term::new(size.cols, size.rows);
    let mut buf = [0u8; 4096];

    loop {
        if quit.load(Ordering::Relaxed) {
            return Ok(Outcome::Quit);
        }
        if let Some(exit) = watcher.poll() {
            return Ok(Outcome::Child(exit));
        }

        match session.read_timeout(&mut buf, READ_INTERVAL)? {
            None => continue,
            Some(0) => {
                // EOF; the watcher usually reports within a beat
                return Ok(match watcher.wait(Duration::from_secs(1)) {
                    Some(exit) => Outcome::Child(exit),
                    None => Outcome::SessionClosed,
                });
            },
            Some(n) => {
                term.process(&buf[..n], backend);
                let cursor = term.cursor();
                backend.move_cursor(cursor.row, cursor.col);
                backend.flush()?;
            },
        }
    }
}

/// Log to a file in the home directory; stderr belongs to the display.
/// Logging is best effort and never blocks startup.
fn init_logging() {
    let Some(home) = std::env::var_os("HOME") else {
        return;
    };
    let Ok(file) = OpenOptions::new()
        .create(true)
        .append(true)
        .open(Path::new(&home).join(LOG_FILE))
    else {
        return;
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}
