//! Unix session implementation
//!
//! Implements PTY creation and shell process management using POSIX APIs.

use std::ffi::CString;
use std::os::fd::BorrowedFd;
use std::os::unix::io::{AsRawFd, RawFd};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use nix::fcntl::{open, OFlag};
use nix::libc::{self, STDERR_FILENO, STDIN_FILENO, STDOUT_FILENO};
use nix::poll::{poll, PollFd, PollFlags};
use nix::pty::{grantpt, posix_openpt, ptsname, unlockpt, PtyMaster};
use nix::sys::signal::{signal, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::sys::wait::{waitpid, WaitPidFlag, WaitStatus};
use nix::unistd::{close, dup2, execvp, fork, getuid, read, setsid, write, ForkResult, Pid, User};

use super::{PtyError, PtyResult, WindowSize};

/// The terminal type advertised to the shell. There is no terminfo entry for
/// it; the emulator only honors the VT100 subset it implements.
const TERM_NAME: &str = "miniterm";

/// Fallback when the account database has no shell for the user.
const DEFAULT_SHELL: &str = "/bin/bash";

/// A pty session with the shell running on the slave end.
///
/// `read` and `write_all` take `&self` so the master descriptor can be
/// shared between the render loop (reads) and the input forwarder (writes).
pub struct Session {
    /// The PTY master file descriptor (blocking mode)
    master: PtyMaster,
    /// The shell process ID
    child: Pid,
    /// Geometry the PTY was created with
    size: WindowSize,
}

impl Session {
    /// Spawn a new session running the given program on a freshly
    /// allocated PTY.
    pub fn spawn(shell: &str, args: &[&str], size: WindowSize) -> PtyResult<Self> {
        // Open PTY master
        let master = posix_openpt(OFlag::O_RDWR | OFlag::O_NOCTTY).map_err(PtyError::OpenMaster)?;

        // Grant access to slave
        grantpt(&master).map_err(PtyError::GrantPty)?;

        // Unlock slave
        unlockpt(&master).map_err(PtyError::UnlockPty)?;

        // Get slave name
        // SAFETY: ptsname is not thread-safe, but we're calling it immediately
        // after unlockpt and before any other thread could interfere
        let slave_name = unsafe { ptsname(&master) }.map_err(PtyError::PtsName)?;

        // Size the PTY before the shell starts
        set_window_size(master.as_raw_fd(), size)?;

        // SAFETY: fork is safe as long as we're careful in the child
        match unsafe { fork() }.map_err(PtyError::Fork)? {
            ForkResult::Child => {
                // Child process
                // Drop the master fd (child doesn't need it)
                drop(master);

                // Create new session
                setsid().map_err(PtyError::Setsid)?;

                // Open slave - this becomes the controlling terminal
                let slave_fd = open(slave_name.as_str(), OFlag::O_RDWR, Mode::empty())
                    .map_err(PtyError::OpenSlave)?;

                // Set controlling terminal (Linux-specific)
                // SAFETY: TIOCSCTTY is a valid ioctl for setting controlling terminal
                unsafe {
                    if libc::ioctl(slave_fd, libc::TIOCSCTTY as _, 0) < 0 {
                        // Non-fatal on some systems
                        tracing::debug!("TIOCSCTTY failed (may be ok)");
                    }
                }

                // Duplicate slave to stdin/stdout/stderr
                dup2(slave_fd, STDIN_FILENO).map_err(PtyError::Dup2)?;
                dup2(slave_fd, STDOUT_FILENO).map_err(PtyError::Dup2)?;
                dup2(slave_fd, STDERR_FILENO).map_err(PtyError::Dup2)?;

                // Close original slave fd if it's not one of the standard fds
                if slave_fd > STDERR_FILENO {
                    let _ = close(slave_fd);
                }

                // Scrub geometry the shell would otherwise inherit stale
                std::env::remove_var("COLUMNS");
                std::env::remove_var("LINES");
                std::env::remove_var("TERMCAP");

                // Export user identity from the account database
                if let Ok(Some(user)) = User::from_uid(getuid()) {
                    std::env::set_var("LOGNAME", &user.name);
                    std::env::set_var("USER", &user.name);
                    std::env::set_var("HOME", &user.dir);
                }
                std::env::set_var("SHELL", shell);
                std::env::set_var("TERM", TERM_NAME);

                // Restore default signal dispositions the emulator may have
                // altered before the fork
                for sig in [
                    Signal::SIGCHLD,
                    Signal::SIGHUP,
                    Signal::SIGINT,
                    Signal::SIGQUIT,
                    Signal::SIGTERM,
                    Signal::SIGALRM,
                ] {
                    // SAFETY: resetting to the default disposition
                    let _ = unsafe { signal(sig, SigHandler::SigDfl) };
                }

                // Convert shell and args to CStrings
                let shell_cstr = CString::new(shell).expect("shell path contains null");
                let mut argv: Vec<CString> = Vec::with_capacity(args.len() + 1);
                argv.push(shell_cstr.clone());
                for arg in args {
                    argv.push(CString::new(*arg).expect("arg contains null"));
                }

                // Execute the shell; failure is fatal to the child only
                execvp(&shell_cstr, &argv).map_err(PtyError::Exec)?;

                // execvp only returns on error
                unreachable!()
            },
            ForkResult::Parent { child } => Ok(Session {
                master,
                child,
                size,
            }),
        }
    }

    /// Spawn a session running the invoking user's shell, resolved from the
    /// account database with a fallback when the entry is missing or empty.
    pub fn spawn_shell(size: WindowSize) -> PtyResult<Self> {
        let shell = User::from_uid(getuid())
            .ok()
            .flatten()
            .map(|user| user.shell.to_string_lossy().into_owned())
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| DEFAULT_SHELL.to_string());
        Self::spawn(&shell, &[], size)
    }

    /// Get the raw file descriptor of the PTY master
    pub fn master_fd(&self) -> RawFd {
        self.master.as_raw_fd()
    }

    /// Get the shell process ID
    pub fn child_pid(&self) -> Pid {
        self.child
    }

    /// Geometry the session was created with
    pub fn size(&self) -> WindowSize {
        self.size
    }

    /// Blocking read from the PTY master.
    ///
    /// Returns `Ok(0)` when the session is closed. On Linux a master read
    /// after the child exits reports `EIO`; that is a close, not a failure.
    pub fn read(&self, buf: &mut [u8]) -> PtyResult<usize> {
        match read(self.master.as_raw_fd(), buf) {
            Ok(n) => Ok(n),
            Err(nix::errno::Errno::EIO) => Ok(0),
            Err(e) => Err(PtyError::Read(e)),
        }
    }

    /// Read from the PTY master, waiting at most `timeout`.
    ///
    /// Returns `Ok(None)` when nothing arrived before the timeout, so the
    /// caller can service its quit flag and the child watcher between
    /// reads. `Ok(Some(0))` means the session is closed.
    pub fn read_timeout(&self, buf: &mut [u8], timeout: Duration) -> PtyResult<Option<usize>> {
        // SAFETY: the master fd is valid for the lifetime of this Session
        let fd = unsafe { BorrowedFd::borrow_raw(self.master.as_raw_fd()) };
        let mut fds = [PollFd::new(&fd, PollFlags::POLLIN)];
        let millis = timeout.as_millis().min(i32::MAX as u128) as i32;
        match poll(&mut fds, millis) {
            Ok(0) => return Ok(None),
            Ok(_) => {},
            Err(nix::errno::Errno::EINTR) => return Ok(None),
            Err(e) => return Err(PtyError::Read(e)),
        }
        // POLLHUP with no pending data reads as EOF below
        self.read(buf).map(Some)
    }

    /// Write to the PTY master, returning the number of bytes written
    pub fn write(&self, data: &[u8]) -> PtyResult<usize> {
        write(self.master.as_raw_fd(), data).map_err(PtyError::Write)
    }

    /// Write all data to the PTY master
    pub fn write_all(&self, mut data: &[u8]) -> PtyResult<()> {
        while !data.is_empty() {
            let n = self.write(data)?;
            data = &data[n..];
        }
        Ok(())
    }

    /// Install the asynchronous child-exit watcher.
    ///
    /// A dedicated thread blocks in `waitpid` until the shell exits or is
    /// killed, then publishes the status. The render loop polls the watcher
    /// between read cycles, so even an abnormal exit goes through orderly
    /// renderer teardown. Install at most one watcher per session.
    pub fn watch_child(&self) -> ChildWatcher {
        let pid = self.child;
        let (tx, rx) = mpsc::channel();
        thread::spawn(move || loop {
            match waitpid(pid, None) {
                Ok(WaitStatus::Exited(_, code)) => {
                    tracing::debug!(code, "shell exited");
                    let _ = tx.send(ChildExit::Code(code));
                    return;
                },
                Ok(WaitStatus::Signaled(_, sig, _)) => {
                    tracing::debug!(signal = %sig, "shell killed by signal");
                    let _ = tx.send(ChildExit::Signal(sig as i32));
                    return;
                },
                Ok(_) => continue,
                Err(e) => {
                    tracing::debug!("waitpid failed: {e}");
                    return;
                },
            }
        });
        ChildWatcher { rx, seen: None }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Best-effort reap in case no watcher ran
        let _ = waitpid(self.child, Some(WaitPidFlag::WNOHANG));
    }
}

/// How the shell ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChildExit {
    /// Exited with this status code
    Code(i32),
    /// Killed by this signal
    Signal(i32),
}

impl ChildExit {
    pub fn success(&self) -> bool {
        matches!(self, ChildExit::Code(0))
    }
}

impl std::fmt::Display for ChildExit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChildExit::Code(code) => write!(f, "exited with status {code}"),
            ChildExit::Signal(sig) => write!(f, "killed by signal {sig}"),
        }
    }
}

/// Receiving end of the child-exit watcher.
pub struct ChildWatcher {
    rx: mpsc::Receiver<ChildExit>,
    seen: Option<ChildExit>,
}

impl ChildWatcher {
    /// Non-blocking check for a recorded exit
    pub fn poll(&mut self) -> Option<ChildExit> {
        if self.seen.is_none() {
            self.seen = self.rx.try_recv().ok();
        }
        self.seen
    }

    /// Wait up to `timeout` for the exit status
    pub fn wait(&mut self, timeout: Duration) -> Option<ChildExit> {
        if self.seen.is_none() {
            self.seen = self.rx.recv_timeout(timeout).ok();
        }
        self.seen
    }
}

/// Set the window size on a PTY file descriptor
fn set_window_size(fd: RawFd, size: WindowSize) -> PtyResult<()> {
    let winsize = libc::winsize {
        ws_row: size.rows,
        ws_col: size.cols,
        ws_xpixel: 0,
        ws_ypixel: 0,
    };

    // SAFETY: TIOCSWINSZ is a valid ioctl for setting window size
    let result = unsafe { libc::ioctl(fd, libc::TIOCSWINSZ, &winsize) };

    if result < 0 {
        Err(PtyError::SetWinsize(nix::errno::Errno::last()))
    } else {
        Ok(())
    }
}
