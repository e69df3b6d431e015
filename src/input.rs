//! Keyboard input forwarding
//!
//! Runs on its own thread: polls the local terminal for key events,
//! translates them to the bytes the shell expects, and writes them to the
//! session master. Ctrl-Q is intercepted as the quit chord and never
//! forwarded.

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::pty::Session;

/// How long one poll waits before rechecking the stop flag
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// What a key event should turn into
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    /// The quit chord (Ctrl-Q)
    Quit,
    /// A single byte for the session
    Forward(u8),
    /// Nothing the shell needs to see
    Ignore,
}

/// Translate one key event into its session byte
pub fn translate(key: &KeyEvent) -> InputAction {
    // Release/repeat events would double every keystroke
    if key.kind != KeyEventKind::Press {
        return InputAction::Ignore;
    }

    if key.modifiers.contains(KeyModifiers::CONTROL) {
        if let KeyCode::Char(c) = key.code {
            let c = c.to_ascii_lowercase();
            if c == 'q' {
                return InputAction::Quit;
            }
            if c.is_ascii_lowercase() {
                return InputAction::Forward(c as u8 & 0x1f);
            }
        }
        return InputAction::Ignore;
    }

    if key.modifiers.contains(KeyModifiers::ALT) {
        return InputAction::Ignore;
    }

    match key.code {
        KeyCode::Char(c) if c.is_ascii() => InputAction::Forward(c as u8),
        KeyCode::Enter => InputAction::Forward(b'\r'),
        KeyCode::Backspace => InputAction::Forward(0x08),
        KeyCode::Tab => InputAction::Forward(b'\t'),
        KeyCode::Esc => InputAction::Forward(0x1b),
        _ => InputAction::Ignore,
    }
}

/// Forwarding loop, run until `quit` is raised here or `stop` is raised by
/// the render loop. Polling keeps the thread joinable.
pub fn forward_keys(session: &Session, quit: &AtomicBool, stop: &AtomicBool) {
    while !stop.load(Ordering::Relaxed) && !quit.load(Ordering::Relaxed) {
        match event::poll(POLL_INTERVAL) {
            Ok(false) => continue,
            Ok(true) => {},
            Err(e) => {
                tracing::warn!(error = %e, "input poll failed, stopping forwarder");
                return;
            },
        }

        let ev = match event::read() {
            Ok(ev) => ev,
            Err(e) => {
                tracing::warn!(error = %e, "input read failed, stopping forwarder");
                return;
            },
        };

        if let Event::Key(key) = ev {
            match translate(&key) {
                InputAction::Quit => {
                    tracing::info!("quit chord pressed");
                    quit.store(true, Ordering::Relaxed);
                    return;
                },
                InputAction::Forward(byte) => {
                    if let Err(e) = session.write_all(&[byte]) {
                        // Usually the child went away; the render loop
                        // notices and shuts down on its own
                        tracing::warn!(error = %e, "session write failed, stopping forwarder");
                        return;
                    }
                },
                InputAction::Ignore => {},
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode, modifiers: KeyModifiers) -> KeyEvent {
        KeyEvent::new(code, modifiers)
    }

    #[test]
    fn plain_characters_forward_their_byte() {
        assert_eq!(
            translate(&press(KeyCode::Char('a'), KeyModifiers::NONE)),
            InputAction::Forward(b'a')
        );
        assert_eq!(
            translate(&press(KeyCode::Char('Z'), KeyModifiers::SHIFT)),
            InputAction::Forward(b'Z')
        );
        assert_eq!(
            translate(&press(KeyCode::Char(' '), KeyModifiers::NONE)),
            InputAction::Forward(b' ')
        );
    }

    #[test]
    fn ctrl_q_is_the_quit_chord() {
        assert_eq!(
            translate(&press(KeyCode::Char('q'), KeyModifiers::CONTROL)),
            InputAction::Quit
        );
        assert_eq!(
            translate(&press(KeyCode::Char('Q'), KeyModifiers::CONTROL)),
            InputAction::Quit
        );
        // Plain q is just a letter
        assert_eq!(
            translate(&press(KeyCode::Char('q'), KeyModifiers::NONE)),
            InputAction::Forward(b'q')
        );
    }

    #[test]
    fn control_letters_become_control_bytes() {
        assert_eq!(
            translate(&press(KeyCode::Char('c'), KeyModifiers::CONTROL)),
            InputAction::Forward(0x03)
        );
        assert_eq!(
            translate(&press(KeyCode::Char('d'), KeyModifiers::CONTROL)),
            InputAction::Forward(0x04)
        );
        assert_eq!(
            translate(&press(KeyCode::Char('L'), KeyModifiers::CONTROL)),
            InputAction::Forward(0x0c)
        );
    }

    #[test]
    fn special_keys_map_to_their_bytes() {
        assert_eq!(
            translate(&press(KeyCode::Enter, KeyModifiers::NONE)),
            InputAction::Forward(b'\r')
        );
        assert_eq!(
            translate(&press(KeyCode::Backspace, KeyModifiers::NONE)),
            InputAction::Forward(0x08)
        );
        assert_eq!(
            translate(&press(KeyCode::Tab, KeyModifiers::NONE)),
            InputAction::Forward(b'\t')
        );
        assert_eq!(
            translate(&press(KeyCode::Esc, KeyModifiers::NONE)),
            InputAction::Forward(0x1b)
        );
    }

    #[test]
    fn unmapped_keys_are_ignored() {
        assert_eq!(
            translate(&press(KeyCode::F(5), KeyModifiers::NONE)),
            InputAction::Ignore
        );
        assert_eq!(
            translate(&press(KeyCode::Up, KeyModifiers::NONE)),
            InputAction::Ignore
        );
        assert_eq!(
            translate(&press(KeyCode::Char('x'), KeyModifiers::ALT)),
            InputAction::Ignore
        );
    }

    #[test]
    fn non_press_events_are_ignored() {
        let mut key = press(KeyCode::Char('a'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        assert_eq!(translate(&key), InputAction::Ignore);
    }
}
