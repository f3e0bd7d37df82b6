use crate::history::HistoryEntry;
use crate::keys::{read_key, Key, KeyInput};
use crate::render::Renderer;
use crate::scoring::{self, ScoredEntry};
use anyhow::Result;

/// Input buffer cap, in bytes.
pub const MAX_INPUT_BYTES: usize = 256;
/// The filtered view never holds more than this many ranked candidates.
pub const MAX_RESULTS: usize = 100;

/// How a finished session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Selected(String),
    Cancelled,
}

/// One interactive selection session: the input buffer, the ranked filtered
/// view over a fixed master list, and the cursor/scroll bookkeeping. Frecency
/// is computed once per session; fuzzy scores are recomputed on every input
/// change.
pub struct Session<'a> {
    master: Vec<ScoredEntry<'a>>,
    pub input: String,
    pub filtered: Vec<ScoredEntry<'a>>,
    pub selected: usize,
    pub scroll: usize,
    max_visible: usize,
}

impl<'a> Session<'a> {
    pub fn new(
        entries: &'a [HistoryEntry],
        initial_query: &str,
        now: i64,
        max_visible: usize,
    ) -> Self {
        let master = entries
            .iter()
            .map(|e| {
                ScoredEntry::new(
                    &e.path,
                    scoring::frecency(e.visit_count, e.last_visit, now),
                    e.visit_count,
                    e.last_visit,
                )
            })
            .collect();

        let mut input = initial_query.to_string();
        while input.len() > MAX_INPUT_BYTES {
            input.pop();
        }

        let mut session = Self {
            master,
            input,
            filtered: Vec::new(),
            selected: 0,
            scroll: 0,
            max_visible: max_visible.max(1),
        };
        session.refilter();
        session
    }

    /// Rebuilds the filtered view from the master list for the current input:
    /// fuzzy-match every entry, drop non-matches, recompute totals, sort,
    /// truncate to the top results.
    pub fn refilter(&mut self) {
        self.filtered.clear();
        for entry in &self.master {
            if let Some(fuzzy) = scoring::fuzzy_score(&self.input, entry.path) {
                let mut scored = *entry;
                scored.set_fuzzy(fuzzy);
                self.filtered.push(scored);
            }
        }
        self.filtered.sort_by(scoring::compare);
        self.filtered.truncate(MAX_RESULTS);
        if !self.filtered.is_empty() && self.selected >= self.filtered.len() {
            self.selected = self.filtered.len() - 1;
            self.adjust_scroll();
        }
    }

    /// Applies one key. `None` keeps the session running; `Some` is the
    /// final outcome. Unrecognized keys change nothing.
    pub fn handle_key(&mut self, key: Key) -> Option<Outcome> {
        match key {
            Key::Char(c) => {
                if self.input.len() < MAX_INPUT_BYTES {
                    self.input.push(c);
                    self.reset_view();
                    self.refilter();
                }
                None
            }
            Key::Backspace => {
                // String::pop removes the whole trailing code point, so a
                // multi-byte UTF-8 character never gets split.
                self.input.pop();
                self.reset_view();
                self.refilter();
                None
            }
            Key::CtrlU => {
                self.input.clear();
                self.reset_view();
                self.refilter();
                None
            }
            Key::CtrlW => {
                self.delete_trailing_word();
                self.reset_view();
                self.refilter();
                None
            }
            Key::Up | Key::CtrlP => {
                if self.selected > 0 {
                    self.selected -= 1;
                }
                self.adjust_scroll();
                None
            }
            Key::Down | Key::CtrlN => {
                if self.selected + 1 < self.filtered.len() {
                    self.selected += 1;
                }
                self.adjust_scroll();
                None
            }
            Key::Enter => Some(match self.filtered.get(self.selected) {
                Some(entry) => Outcome::Selected(entry.path.to_string()),
                None => Outcome::Cancelled,
            }),
            Key::Esc | Key::CtrlC | Key::Eof => Some(Outcome::Cancelled),
            Key::Left | Key::Right | Key::Delete | Key::Unknown => None,
        }
    }

    /// Pre-interactive shortcut, only meaningful when an initial query was
    /// supplied: a single match is taken as-is, and a top match that clears
    /// `threshold` and beats the runner-up's fuzzy score by more than
    /// `margin` is unambiguous enough to skip the prompt.
    pub fn auto_select(&self, threshold: i64, margin: i64) -> Option<&'a str> {
        if self.input.is_empty() {
            return None;
        }
        match self.filtered.as_slice() {
            [] => None,
            [only] => Some(only.path),
            [first, second, ..] => (first.fuzzy_score >= threshold
                && first.fuzzy_score - second.fuzzy_score > margin)
                .then_some(first.path),
        }
    }

    /// Blocking key loop: each key fully mutates state and redraws before the
    /// next read. Returns when a key decides the outcome or input ends.
    pub fn run(mut self, keys: &mut impl KeyInput, renderer: &mut Renderer) -> Result<Outcome> {
        renderer.draw(
            &self.input,
            &self.filtered,
            self.selected,
            self.scroll,
            self.max_visible,
        )?;
        loop {
            let key = read_key(keys);
            if let Some(outcome) = self.handle_key(key) {
                renderer.clear()?;
                return Ok(outcome);
            }
            renderer.draw(
                &self.input,
                &self.filtered,
                self.selected,
                self.scroll,
                self.max_visible,
            )?;
        }
    }

    fn reset_view(&mut self) {
        self.selected = 0;
        self.scroll = 0;
    }

    // Keeps the selection inside the visible window.
    fn adjust_scroll(&mut self) {
        if self.selected < self.scroll {
            self.scroll = self.selected;
        } else if self.selected >= self.scroll + self.max_visible {
            self.scroll = self.selected + 1 - self.max_visible;
        }
    }

    fn delete_trailing_word(&mut self) {
        while self.input.ends_with(|c: char| c.is_whitespace()) {
            self.input.pop();
        }
        while !self.input.is_empty() && !self.input.ends_with(|c: char| c.is_whitespace()) {
            self.input.pop();
        }
    }
}
