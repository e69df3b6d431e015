//! Render backend
//!
//! The interpreter drives a `Backend`: a full-screen character-cell display
//! with color-pair resources, in the curses mold. The real implementation
//! sits on crossterm; tests substitute an in-memory recorder.

mod terminal;

pub use terminal::TerminalBackend;

/// A cell color: the terminal default or one of the 8 base colors (the
/// standard ANSI palette, index 0-7).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Color {
    Default,
    Base(u8),
}

/// The rendering surface the interpreter paints into.
///
/// Coordinates are 0-based (row, col). Paints use whatever pair/bold/reverse
/// attributes were last selected. Commands may be buffered; `flush` makes
/// the frame visible and repositioning the physical cursor is the caller's
/// job before flushing.
pub trait Backend {
    fn rows(&self) -> u16;
    fn cols(&self) -> u16;

    /// Paint one character at (row, col) with the active attributes
    fn paint(&mut self, row: u16, col: u16, ch: char);

    /// Blank from (row, col) to the end of that line
    fn clear_to_eol(&mut self, row: u16, col: u16);

    /// Blank from (row, col) to the end of the screen
    fn clear_to_eos(&mut self, row: u16, col: u16);

    /// Blank the entire screen
    fn clear_all(&mut self);

    /// Scroll the whole screen up by one line
    fn scroll_up(&mut self);

    /// Capacity of the color-pair table. Pair 0 is predefined as
    /// (default, default) and selectable without a `define_pair` call.
    fn max_pairs(&self) -> usize;

    /// Bind a pair id to a (foreground, background) combination
    fn define_pair(&mut self, id: u16, fg: Color, bg: Color);

    /// Make a previously defined pair the active one
    fn select_pair(&mut self, id: u16);

    fn set_bold(&mut self, on: bool);
    fn set_reverse(&mut self, on: bool);

    /// Move the physical cursor
    fn move_cursor(&mut self, row: u16, col: u16);

    /// Make everything queued so far visible
    fn flush(&mut self) -> std::io::Result<()>;
}
