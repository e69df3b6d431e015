//! PTY session handling for Linux
//!
//! This module creates the pseudoterminal, spawns the user's shell on the
//! slave end, and exposes the master descriptor for concurrent read/write.

#[cfg(unix)]
mod unix;

#[cfg(unix)]
pub use unix::{ChildExit, ChildWatcher, Session};

/// Error type for session operations
#[derive(Debug, thiserror::Error)]
pub enum PtyError {
    #[error("Failed to open PTY master: {0}")]
    OpenMaster(#[source] nix::Error),

    #[error("Failed to grant PTY access: {0}")]
    GrantPty(#[source] nix::Error),

    #[error("Failed to unlock PTY: {0}")]
    UnlockPty(#[source] nix::Error),

    #[error("Failed to get PTY slave name: {0}")]
    PtsName(#[source] nix::Error),

    #[error("Failed to open PTY slave: {0}")]
    OpenSlave(#[source] nix::Error),

    #[error("Failed to fork: {0}")]
    Fork(#[source] nix::Error),

    #[error("Failed to create session: {0}")]
    Setsid(#[source] nix::Error),

    #[error("Failed to duplicate file descriptor: {0}")]
    Dup2(#[source] nix::Error),

    #[error("Failed to execute shell: {0}")]
    Exec(#[source] nix::Error),

    #[error("Failed to set window size: {0}")]
    SetWinsize(#[source] nix::Error),

    #[error("Failed to read from PTY: {0}")]
    Read(#[source] nix::Error),

    #[error("Failed to write to PTY: {0}")]
    Write(#[source] nix::Error),
}

/// Result type for session operations
pub type PtyResult<T> = Result<T, PtyError>;

/// Window size for the PTY
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowSize {
    pub rows: u16,
    pub cols: u16,
}

impl WindowSize {
    pub fn new(cols: u16, rows: u16) -> Self {
        Self { rows, cols }
    }
}

impl Default for WindowSize {
    fn default() -> Self {
        Self::new(80, 24)
    }
}
