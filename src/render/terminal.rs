//! Crossterm backend
//!
//! Raw mode plus the host terminal's alternate screen. Paint commands are
//! queued into a string buffer and written out in one burst on `flush`.

use std::io::{self, Write};

use crossterm::cursor::MoveTo;
use crossterm::style::{
    Attribute, Color as CtColor, Print, SetAttribute, SetBackgroundColor, SetForegroundColor,
};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, size, Clear, ClearType, EnterAlternateScreen,
    LeaveAlternateScreen, ScrollUp,
};
use crossterm::{execute, Command};

use super::{Backend, Color};

/// Color-pair table capacity
const MAX_PAIRS: usize = 256;

/// Full-screen crossterm surface. Restores the host terminal on `restore`
/// or on drop, whichever comes first.
pub struct TerminalBackend {
    rows: u16,
    cols: u16,
    /// Queued ANSI commands for the current frame
    buf: String,
    pairs: Vec<Option<(Color, Color)>>,
    restored: bool,
}

impl TerminalBackend {
    /// Enter raw full-screen mode and report the terminal geometry
    pub fn new() -> io::Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        if let Err(e) = execute!(
            stdout,
            EnterAlternateScreen,
            Clear(ClearType::All),
            MoveTo(0, 0)
        ) {
            let _ = disable_raw_mode();
            return Err(e);
        }
        let (cols, rows) = size()?;

        // Pair 0 is always (default, default)
        let mut pairs = vec![None; MAX_PAIRS];
        pairs[0] = Some((Color::Default, Color::Default));

        Ok(Self {
            rows,
            cols,
            buf: String::new(),
            pairs,
            restored: false,
        })
    }

    /// Leave raw mode and the alternate screen. Idempotent.
    pub fn restore(&mut self) {
        if self.restored {
            return;
        }
        self.restored = true;
        let _ = execute!(
            io::stdout(),
            SetAttribute(Attribute::Reset),
            LeaveAlternateScreen
        );
        let _ = disable_raw_mode();
    }

    fn queue(&mut self, command: impl Command) {
        // Writing ANSI into a String cannot fail
        let _ = command.write_ansi(&mut self.buf);
    }
}

impl Drop for TerminalBackend {
    fn drop(&mut self) {
        self.restore();
    }
}

impl Backend for TerminalBackend {
    fn rows(&self) -> u16 {
        self.rows
    }

    fn cols(&self) -> u16 {
        self.cols
    }

    fn paint(&mut self, row: u16, col: u16, ch: char) {
        self.queue(MoveTo(col, row));
        self.queue(Print(ch));
    }

    fn clear_to_eol(&mut self, row: u16, col: u16) {
        self.queue(MoveTo(col, row));
        self.queue(Clear(ClearType::UntilNewLine));
    }

    fn clear_to_eos(&mut self, row: u16, col: u16) {
        self.queue(MoveTo(col, row));
        self.queue(Clear(ClearType::FromCursorDown));
    }

    fn clear_all(&mut self) {
        self.queue(Clear(ClearType::All));
    }

    fn scroll_up(&mut self) {
        self.queue(ScrollUp(1));
    }

    fn max_pairs(&self) -> usize {
        MAX_PAIRS
    }

    fn define_pair(&mut self, id: u16, fg: Color, bg: Color) {
        if let Some(slot) = self.pairs.get_mut(id as usize) {
            *slot = Some((fg, bg));
        }
    }

    fn select_pair(&mut self, id: u16) {
        if let Some(Some((fg, bg))) = self.pairs.get(id as usize).copied() {
            let (fg, bg) = (to_crossterm(fg), to_crossterm(bg));
            self.queue(SetForegroundColor(fg));
            self.queue(SetBackgroundColor(bg));
        }
    }

    fn set_bold(&mut self, on: bool) {
        self.queue(SetAttribute(if on {
            Attribute::Bold
        } else {
            Attribute::NormalIntensity
        }));
    }

    fn set_reverse(&mut self, on: bool) {
        self.queue(SetAttribute(if on {
            Attribute::Reverse
        } else {
            Attribute::NoReverse
        }));
    }

    fn move_cursor(&mut self, row: u16, col: u16) {
        self.queue(MoveTo(col, row));
    }

    fn flush(&mut self) -> io::Result<()> {
        let mut stdout = io::stdout();
        stdout.write_all(self.buf.as_bytes())?;
        stdout.flush()?;
        self.buf.clear();
        Ok(())
    }
}

/// Map to the crossterm palette; the 8 base colors are the dark variants.
fn to_crossterm(color: Color) -> CtColor {
    match color {
        Color::Default => CtColor::Reset,
        Color::Base(0) => CtColor::Black,
        Color::Base(1) => CtColor::DarkRed,
        Color::Base(2) => CtColor::DarkGreen,
        Color::Base(3) => CtColor::DarkYellow,
        Color::Base(4) => CtColor::DarkBlue,
        Color::Base(5) => CtColor::DarkMagenta,
        Color::Base(6) => CtColor::DarkCyan,
        Color::Base(_) => CtColor::Grey,
    }
}
