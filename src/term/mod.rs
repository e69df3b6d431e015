//! Terminal interpreter
//!
//! Applies parsed actions to a render backend, maintaining cursor and
//! attribute state across read cycles. This is the integration point
//! between the parser and the screen: the render loop feeds it raw session
//! bytes and it drives the backend cell by cell.
//!
//! The cursor is always inside `[0, cols) x [0, rows)` after any control
//! function; out-of-range requests clamp. Unsupported sequences are logged
//! and skipped so shell output can never take the emulator down.

mod attrs;

pub use attrs::{Attributes, DEFAULT_PAIR};

use crate::parser::{Action, CsiParams, Parser};
use crate::render::Backend;

/// Logical cursor position, 0-based
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Cursor {
    pub col: u16,
    pub row: u16,
}

/// The escape-sequence interpreter
pub struct Term {
    cols: u16,
    rows: u16,
    cursor: Cursor,
    /// Single save/restore slot (CSI s / CSI u)
    saved: Cursor,
    attrs: Attributes,
    parser: Parser,
}

impl Term {
    /// Create an interpreter for a screen of the given geometry
    pub fn new(cols: u16, rows: u16) -> Self {
        Self {
            cols: cols.max(1),
            rows: rows.max(1),
            cursor: Cursor::default(),
            saved: Cursor::default(),
            attrs: Attributes::new(),
            parser: Parser::new(),
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn attrs(&self) -> &Attributes {
        &self.attrs
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    /// Feed session output through the parser and apply every resulting
    /// action to the backend
    pub fn process<B: Backend>(&mut self, data: &[u8], backend: &mut B) {
        for action in self.parser.parse(data) {
            self.apply(action, backend);
        }
    }

    fn last_row(&self) -> u16 {
        self.rows - 1
    }

    fn last_col(&self) -> u16 {
        self.cols - 1
    }

    fn apply<B: Backend>(&mut self, action: Action, backend: &mut B) {
        match action {
            Action::Print(byte) => {
                backend.paint(self.cursor.row, self.cursor.col, byte as char);
                // No autowrap: printing in the last column stays there
                self.cursor.col = (self.cursor.col + 1).min(self.last_col());
            },
            Action::LineFeed => {
                self.cursor.col = 0;
                if self.cursor.row == self.last_row() {
                    backend.scroll_up();
                } else {
                    self.cursor.row += 1;
                }
            },
            Action::Backspace => {
                backend.paint(self.cursor.row, self.cursor.col, ' ');
                self.cursor.col = self.cursor.col.saturating_sub(1);
            },
            Action::Csi { params, terminator } => {
                self.dispatch_csi(&params, terminator, backend);
            },
        }
    }

    fn dispatch_csi<B: Backend>(&mut self, params: &CsiParams, terminator: u8, backend: &mut B) {
        let n = params.get(0);
        match terminator {
            // ICH, approximated: blank cells without shifting the rest
            b'@' => {
                let end = self.cursor.col.saturating_add(n).min(self.cols);
                for col in self.cursor.col..end {
                    backend.paint(self.cursor.row, col, ' ');
                }
            },
            // Cursor movement, relative
            b'A' => self.cursor.row = self.cursor.row.saturating_sub(n),
            b'B' | b'e' => {
                self.cursor.row = self.cursor.row.saturating_add(n).min(self.last_row());
            },
            b'C' | b'a' => {
                self.cursor.col = self.cursor.col.saturating_add(n).min(self.last_col());
            },
            b'D' => self.cursor.col = self.cursor.col.saturating_sub(n),
            b'E' => {
                self.cursor.row = self.cursor.row.saturating_add(n).min(self.last_row());
                self.cursor.col = 0;
            },
            b'F' => {
                self.cursor.row = self.cursor.row.saturating_sub(n);
                self.cursor.col = 0;
            },
            // Absolute positioning, 1-based parameters
            b'G' => self.cursor.col = n.saturating_sub(1).min(self.last_col()),
            b'H' | b'f' => {
                self.cursor.row = params.get(0).saturating_sub(1).min(self.last_row());
                self.cursor.col = params.get(1).saturating_sub(1).min(self.last_col());
            },
            b'd' => self.cursor.row = n.saturating_sub(1).min(self.last_row()),
            // ED - erase in display, cursor unmoved
            b'J' => match n {
                0 => backend.clear_to_eos(self.cursor.row, self.cursor.col),
                1 => {
                    for row in 0..self.cursor.row {
                        backend.clear_to_eol(row, 0);
                    }
                    for col in 0..=self.cursor.col {
                        backend.paint(self.cursor.row, col, ' ');
                    }
                },
                2 | 3 => backend.clear_all(),
                mode => tracing::debug!(mode, "ignoring unsupported ED mode"),
            },
            // EL - erase in line
            b'K' => match n {
                0 => backend.clear_to_eol(self.cursor.row, self.cursor.col),
                1 => {
                    for col in 0..=self.cursor.col {
                        backend.paint(self.cursor.row, col, ' ');
                    }
                },
                2 => backend.clear_to_eol(self.cursor.row, 0),
                mode => tracing::debug!(mode, "ignoring unsupported EL mode"),
            },
            // DL, approximated: blank N lines from the cursor row
            b'M' => {
                let count = n.min(self.rows - self.cursor.row);
                for i in 0..count {
                    backend.clear_to_eol(self.cursor.row + i, 0);
                }
            },
            // DA - accepted, no reply
            b'c' => {},
            // TBC - nothing to clear, tabs are not tracked
            b'g' => {},
            b's' => self.saved = self.cursor,
            b'u' => {
                self.cursor = Cursor {
                    row: self.saved.row.min(self.last_row()),
                    col: self.saved.col.min(self.last_col()),
                };
            },
            b'm' => self.attrs.apply_sgr(params, backend),
            _ => {
                tracing::debug!(
                    terminator = %(terminator as char),
                    "ignoring unsupported CSI sequence"
                );
            },
        }

        debug_assert!(self.cursor.row < self.rows && self.cursor.col < self.cols);
    }
}
