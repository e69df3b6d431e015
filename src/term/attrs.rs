//! Attribute / color-pair management
//!
//! Resolves SGR parameters into backend attribute calls. Color pairs are a
//! renderer resource binding one (foreground, background) combination to an
//! id; ids are cached per combination and bounded by the backend's pair
//! table, so repeated color changes never exhaust the renderer.

use std::collections::HashMap;

use crate::parser::CsiParams;
use crate::render::{Backend, Color};

/// Pair id for (default, default); predefined by every backend.
pub const DEFAULT_PAIR: u16 = 0;

/// Current graphic rendition plus the pair cache.
#[derive(Debug)]
pub struct Attributes {
    fg: Color,
    bg: Color,
    bold: bool,
    reverse: bool,
    /// Active color-pair id
    pair: u16,
    /// (fg, bg) -> pair id
    cache: HashMap<(Color, Color), u16>,
    next_id: u16,
}

impl Default for Attributes {
    fn default() -> Self {
        Self::new()
    }
}

impl Attributes {
    pub fn new() -> Self {
        let mut cache = HashMap::new();
        cache.insert((Color::Default, Color::Default), DEFAULT_PAIR);
        Self {
            fg: Color::Default,
            bg: Color::Default,
            bold: false,
            reverse: false,
            pair: DEFAULT_PAIR,
            cache,
            next_id: DEFAULT_PAIR + 1,
        }
    }

    pub fn fg(&self) -> Color {
        self.fg
    }

    pub fn bg(&self) -> Color {
        self.bg
    }

    pub fn bold(&self) -> bool {
        self.bold
    }

    pub fn reverse(&self) -> bool {
        self.reverse
    }

    pub fn pair(&self) -> u16 {
        self.pair
    }

    /// Apply one SGR sequence. Unknown parameters are logged and skipped.
    pub fn apply_sgr<B: Backend>(&mut self, params: &CsiParams, backend: &mut B) {
        for i in 0..params.len().max(1) {
            match params.get(i) {
                0 => {
                    self.bold = false;
                    self.reverse = false;
                    backend.set_bold(false);
                    backend.set_reverse(false);
                    self.set_colors(Color::Default, Color::Default, backend);
                },
                1 => {
                    self.bold = true;
                    backend.set_bold(true);
                },
                7 => {
                    self.reverse = true;
                    backend.set_reverse(true);
                },
                27 => {
                    self.reverse = false;
                    backend.set_reverse(false);
                },
                p @ 30..=37 => {
                    self.set_colors(Color::Base((p - 30) as u8), self.bg, backend);
                },
                38 | 39 => {
                    self.set_colors(Color::Default, self.bg, backend);
                },
                p @ 40..=47 => {
                    self.set_colors(self.fg, Color::Base((p - 40) as u8), backend);
                },
                49 => {
                    self.set_colors(self.fg, Color::Default, backend);
                },
                p => {
                    tracing::debug!(param = p, "ignoring unsupported SGR parameter");
                },
            }
        }
    }

    /// Switch to the pair for (fg, bg), allocating it on first use. When the
    /// pair table is full a new combination is refused and the current pair
    /// stays active.
    fn set_colors<B: Backend>(&mut self, fg: Color, bg: Color, backend: &mut B) {
        if fg == self.fg && bg == self.bg {
            return;
        }

        if let Some(&id) = self.cache.get(&(fg, bg)) {
            self.fg = fg;
            self.bg = bg;
            self.pair = id;
            backend.select_pair(id);
            return;
        }

        if self.cache.len() >= backend.max_pairs() {
            tracing::warn!(
                ?fg,
                ?bg,
                "color-pair table exhausted, keeping current colors"
            );
            return;
        }

        let id = self.next_id;
        self.next_id += 1;
        backend.define_pair(id, fg, bg);
        self.cache.insert((fg, bg), id);
        self.fg = fg;
        self.bg = bg;
        self.pair = id;
        backend.select_pair(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{Action, Parser};

    /// Backend stub that records pair traffic only.
    struct PairLog {
        capacity: usize,
        defined: Vec<(u16, Color, Color)>,
        selected: Vec<u16>,
        bold: bool,
        reverse: bool,
    }

    impl PairLog {
        fn new(capacity: usize) -> Self {
            Self {
                capacity,
                defined: Vec::new(),
                selected: Vec::new(),
                bold: false,
                reverse: false,
            }
        }
    }

    impl Backend for PairLog {
        fn rows(&self) -> u16 {
            24
        }
        fn cols(&self) -> u16 {
            80
        }
        fn paint(&mut self, _row: u16, _col: u16, _ch: char) {}
        fn clear_to_eol(&mut self, _row: u16, _col: u16) {}
        fn clear_to_eos(&mut self, _row: u16, _col: u16) {}
        fn clear_all(&mut self) {}
        fn scroll_up(&mut self) {}
        fn max_pairs(&self) -> usize {
            self.capacity
        }
        fn define_pair(&mut self, id: u16, fg: Color, bg: Color) {
            self.defined.push((id, fg, bg));
        }
        fn select_pair(&mut self, id: u16) {
            self.selected.push(id);
        }
        fn set_bold(&mut self, on: bool) {
            self.bold = on;
        }
        fn set_reverse(&mut self, on: bool) {
            self.reverse = on;
        }
        fn move_cursor(&mut self, _row: u16, _col: u16) {}
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn sgr(attrs: &mut Attributes, backend: &mut PairLog, seq: &str) {
        let mut parser = Parser::new();
        for action in parser.parse(seq.as_bytes()) {
            if let Action::Csi { params, .. } = action {
                attrs.apply_sgr(&params, backend);
            }
        }
    }

    #[test]
    fn sgr_sets_and_resets_everything() {
        let mut attrs = Attributes::new();
        let mut backend = PairLog::new(16);

        sgr(&mut attrs, &mut backend, "\x1b[1;7;31;44m");
        assert!(attrs.bold());
        assert!(attrs.reverse());
        assert_eq!(attrs.fg(), Color::Base(1));
        assert_eq!(attrs.bg(), Color::Base(4));
        assert!(backend.bold);
        assert!(backend.reverse);

        sgr(&mut attrs, &mut backend, "\x1b[0m");
        assert!(!attrs.bold());
        assert!(!attrs.reverse());
        assert_eq!(attrs.fg(), Color::Default);
        assert_eq!(attrs.bg(), Color::Default);
        assert_eq!(attrs.pair(), DEFAULT_PAIR);
        assert!(!backend.bold);
        assert!(!backend.reverse);
    }

    #[test]
    fn repeated_colors_reuse_pair_ids() {
        let mut attrs = Attributes::new();
        let mut backend = PairLog::new(16);

        sgr(&mut attrs, &mut backend, "\x1b[31m");
        let red = attrs.pair();
        sgr(&mut attrs, &mut backend, "\x1b[32m");
        sgr(&mut attrs, &mut backend, "\x1b[31m");

        assert_eq!(attrs.pair(), red);
        // Two combinations, two definitions, no more
        assert_eq!(backend.defined.len(), 2);
    }

    #[test]
    fn exhausted_pair_table_keeps_current_colors() {
        let mut attrs = Attributes::new();
        // Room for the default pair plus two combinations
        let mut backend = PairLog::new(3);

        sgr(&mut attrs, &mut backend, "\x1b[31m");
        sgr(&mut attrs, &mut backend, "\x1b[32m");
        let before = (attrs.fg(), attrs.pair());

        // Table is full, a third combination is refused
        sgr(&mut attrs, &mut backend, "\x1b[33m");
        assert_eq!((attrs.fg(), attrs.pair()), before);
        assert_eq!(backend.defined.len(), 2);

        // Cached combinations still switch fine
        sgr(&mut attrs, &mut backend, "\x1b[31m");
        assert_eq!(attrs.fg(), Color::Base(1));
    }

    #[test]
    fn sgr_27_clears_reverse_only() {
        let mut attrs = Attributes::new();
        let mut backend = PairLog::new(16);

        sgr(&mut attrs, &mut backend, "\x1b[1;7m");
        sgr(&mut attrs, &mut backend, "\x1b[27m");
        assert!(attrs.bold());
        assert!(!attrs.reverse());
    }

    #[test]
    fn sgr_39_49_restore_default_colors() {
        let mut attrs = Attributes::new();
        let mut backend = PairLog::new(16);

        sgr(&mut attrs, &mut backend, "\x1b[31;44m");
        sgr(&mut attrs, &mut backend, "\x1b[39m");
        assert_eq!(attrs.fg(), Color::Default);
        assert_eq!(attrs.bg(), Color::Base(4));

        sgr(&mut attrs, &mut backend, "\x1b[49m");
        assert_eq!(attrs.bg(), Color::Default);
        assert_eq!(attrs.pair(), DEFAULT_PAIR);
    }

    #[test]
    fn unknown_sgr_parameter_is_ignored() {
        let mut attrs = Attributes::new();
        let mut backend = PairLog::new(16);

        sgr(&mut attrs, &mut backend, "\x1b[4;31m");
        // 4 (underline) is unsupported, 31 still lands
        assert_eq!(attrs.fg(), Color::Base(1));
    }
}
