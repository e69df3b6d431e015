//! miniterm library
//!
//! A minimal Linux terminal emulator: a shell on a pty, a VT100-subset
//! interpreter, and a crossterm display. This crate provides:
//!
//! - `pty`: pty allocation, shell spawning, child-exit watching
//! - `parser`: the three-state escape sequence parser
//! - `term`: the interpreter that applies parsed actions to a render backend
//! - `render`: the backend trait and its crossterm implementation
//! - `input`: keyboard event translation and the forwarding loop

pub mod input;
pub mod parser;
pub mod pty;
pub mod render;
pub mod term;
