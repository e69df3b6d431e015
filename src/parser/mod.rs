//! Escape sequence parser
//!
//! A stateful parser that converts session output bytes into terminal
//! actions. Three states cover the supported VT100 subset:
//!
//! - Ground: printable bytes and C0 controls
//! - Escape: after ESC, waiting for one byte
//! - Csi: after ESC [, collecting numeric parameters
//!
//! Transitions are a pure function of (state, byte), and the parser is
//! stable across arbitrary chunk boundaries. Malformed or oversized
//! sequences are dropped, never fatal.

mod actions;

pub use actions::{Action, CsiParams, MAX_PARAMS, PARAM_MAX};

/// Parser state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Ground,
    Escape,
    Csi,
}

/// The escape sequence parser
#[derive(Debug)]
pub struct Parser {
    state: State,
    /// Committed parameters for the current CSI sequence
    params: CsiParams,
    /// Current parameter being accumulated
    current: u16,
    /// Set when the sequence committed more parameters than fit; the whole
    /// sequence is dropped at dispatch time
    overflowed: bool,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    /// Create a new parser in the ground state
    pub fn new() -> Self {
        Self {
            state: State::Ground,
            params: CsiParams::new(),
            current: 0,
            overflowed: false,
        }
    }

    /// Whether the parser is in the ground state
    pub fn in_ground(&self) -> bool {
        self.state == State::Ground
    }

    /// Process a chunk of bytes, returning actions
    pub fn parse(&mut self, data: &[u8]) -> Vec<Action> {
        let mut actions = Vec::new();

        for &byte in data {
            if let Some(action) = self.process_byte(byte) {
                actions.push(action);
            }
        }

        actions
    }

    /// Process a single byte
    pub fn process_byte(&mut self, byte: u8) -> Option<Action> {
        match self.state {
            State::Ground => self.process_ground(byte),
            State::Escape => self.process_escape(byte),
            State::Csi => self.process_csi(byte),
        }
    }

    /// Clear parameter state
    fn clear_params(&mut self) {
        self.params = CsiParams::new();
        self.current = 0;
        self.overflowed = false;
    }

    fn process_ground(&mut self, byte: u8) -> Option<Action> {
        match byte {
            0x1B => {
                self.state = State::Escape;
                None
            },
            b'\n' => Some(Action::LineFeed),
            0x08 => Some(Action::Backspace),
            // Printable ASCII
            0x20..=0x7E => Some(Action::Print(byte)),
            // Other control bytes (and anything above ASCII) are ignored
            _ => None,
        }
    }

    fn process_escape(&mut self, byte: u8) -> Option<Action> {
        match byte {
            // NEL - next line
            b'E' => {
                self.state = State::Ground;
                Some(Action::LineFeed)
            },
            b'[' => {
                self.state = State::Csi;
                self.clear_params();
                None
            },
            _ => {
                // Unsupported escape, drop it
                self.state = State::Ground;
                None
            },
        }
    }

    fn process_csi(&mut self, byte: u8) -> Option<Action> {
        match byte {
            b'0'..=b'9' => {
                let digit = u16::from(byte - b'0');
                self.current = self
                    .current
                    .saturating_mul(10)
                    .saturating_add(digit)
                    .min(PARAM_MAX);
                None
            },
            b';' => {
                if !self.params.push(self.current) {
                    self.overflowed = true;
                }
                self.current = 0;
                None
            },
            // A stray ESC abandons the sequence and starts over
            0x1B => {
                self.state = State::Escape;
                None
            },
            terminator => {
                if !self.params.push(self.current) {
                    self.overflowed = true;
                }
                self.state = State::Ground;
                if self.overflowed {
                    tracing::debug!(
                        terminator = %(terminator as char),
                        "dropping CSI sequence with too many parameters"
                    );
                    None
                } else {
                    Some(Action::Csi {
                        params: self.params,
                        terminator,
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn csi(actions: &[Action]) -> (CsiParams, u8) {
        assert_eq!(actions.len(), 1, "expected one action: {:?}", actions);
        match actions[0] {
            Action::Csi { params, terminator } => (params, terminator),
            other => panic!("expected Csi, got {:?}", other),
        }
    }

    #[test]
    fn test_parser_print() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"Hello");

        assert_eq!(actions.len(), 5);
        assert_eq!(actions[0], Action::Print(b'H'));
        assert_eq!(actions[4], Action::Print(b'o'));
        assert!(parser.in_ground());
    }

    #[test]
    fn test_parser_controls() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"A\nB\x08C");

        assert_eq!(
            actions,
            vec![
                Action::Print(b'A'),
                Action::LineFeed,
                Action::Print(b'B'),
                Action::Backspace,
                Action::Print(b'C'),
            ]
        );
    }

    #[test]
    fn test_parser_ignores_other_controls() {
        let mut parser = Parser::new();
        // BEL, CR, TAB, DEL and a high byte all pass silently
        let actions = parser.parse(b"\x07\r\t\x7f\xff");
        assert!(actions.is_empty());
        assert!(parser.in_ground());
    }

    #[test]
    fn test_parser_csi_single_param() {
        let mut parser = Parser::new();
        let (params, terminator) = csi(&parser.parse(b"\x1b[5A"));

        assert_eq!(params.get(0), 5);
        assert_eq!(params.len(), 1);
        assert_eq!(terminator, b'A');
    }

    #[test]
    fn test_parser_csi_two_params() {
        let mut parser = Parser::new();
        let (params, terminator) = csi(&parser.parse(b"\x1b[10;20H"));

        assert_eq!(params.get(0), 10);
        assert_eq!(params.get(1), 20);
        assert_eq!(terminator, b'H');
    }

    #[test]
    fn test_parser_csi_missing_params_default_zero() {
        let mut parser = Parser::new();
        let (params, terminator) = csi(&parser.parse(b"\x1b[H"));

        assert_eq!(terminator, b'H');
        assert_eq!(params.get(0), 0);
        assert_eq!(params.get(1), 0);
    }

    #[test]
    fn test_parser_csi_param_saturates() {
        let mut parser = Parser::new();
        let (params, _) = csi(&parser.parse(b"\x1b[123456m"));

        assert_eq!(params.get(0), PARAM_MAX);
    }

    #[test]
    fn test_parser_csi_too_many_params_dropped() {
        let mut parser = Parser::new();
        let seq = format!("\x1b[{}m", "1;".repeat(MAX_PARAMS));
        let actions = parser.parse(seq.as_bytes());

        assert!(actions.is_empty());
        assert!(parser.in_ground());

        // The parser recovers: the next sequence dispatches normally
        let (params, terminator) = csi(&parser.parse(b"\x1b[2J"));
        assert_eq!(params.get(0), 2);
        assert_eq!(terminator, b'J');
    }

    #[test]
    fn test_parser_unknown_escape_dropped() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b(X");

        // ESC ( is unsupported; the following byte prints normally
        assert_eq!(actions, vec![Action::Print(b'X')]);
    }

    #[test]
    fn test_parser_escape_e_is_linefeed() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1bE");
        assert_eq!(actions, vec![Action::LineFeed]);
    }

    #[test]
    fn test_parser_chunk_boundary() {
        let mut parser = Parser::new();

        assert!(parser.parse(b"\x1b[").is_empty());
        assert!(parser.parse(b"5").is_empty());
        let (params, terminator) = csi(&parser.parse(b"A"));

        assert_eq!(params.get(0), 5);
        assert_eq!(terminator, b'A');
    }

    #[test]
    fn test_parser_esc_restarts_inside_csi() {
        let mut parser = Parser::new();
        let actions = parser.parse(b"\x1b[12\x1b[3m");

        let (params, terminator) = csi(&actions);
        assert_eq!(params.get(0), 3);
        assert_eq!(terminator, b'm');
    }
}
