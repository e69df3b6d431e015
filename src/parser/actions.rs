//! Actions produced by the parser
//!
//! These represent the semantic meaning of decoded bytes and sequences; the
//! interpreter in `crate::term` applies them to a render backend.

/// Maximum number of committed CSI parameters. A sequence that tries to
/// commit more is rejected whole.
pub const MAX_PARAMS: usize = 16;

/// Maximum value of a single CSI parameter; digit accumulation saturates
/// here instead of wrapping or truncating.
pub const PARAM_MAX: u16 = 9999;

/// Fixed-capacity CSI parameter list.
///
/// Missing parameters read as 0, matching the dispatch defaults.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CsiParams {
    slots: [u16; MAX_PARAMS],
    len: usize,
}

impl CsiParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed parameter. Returns false when the list is full;
    /// the parser uses that to poison the sequence.
    #[must_use]
    pub fn push(&mut self, value: u16) -> bool {
        if self.len == MAX_PARAMS {
            return false;
        }
        self.slots[self.len] = value;
        self.len += 1;
        true
    }

    /// Parameter at `index`, defaulting to 0 when absent
    pub fn get(&self, index: usize) -> u16 {
        if index < self.len {
            self.slots[index]
        } else {
            0
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Actions produced by the parser
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Paint a printable byte at the cursor and advance one column
    Print(u8),

    /// Line feed (also produced by ESC E): column 0, next row,
    /// scrolling on the last row
    LineFeed,

    /// Blank the current cell and step the cursor back one column
    Backspace,

    /// A complete control sequence: ESC [ params terminator
    Csi {
        params: CsiParams,
        terminator: u8,
    },
}
