/// Progressive revealer: exposes the running transcript one character per tick
///
/// The reveal runs independently of fragment arrival, so a transcript that
/// landed in one burst and one that trickled in read the same. The displayed
/// text is always a character-count prefix of the committed text as currently
/// known.

use std::time::{Duration, Instant};

use crate::constants::reveal;

pub struct Revealer {
    displayed_text: String,

    /// Number of characters revealed so far; never exceeds the committed
    /// text's character count
    cursor: usize,

    tick_period: Duration,
    last_tick: Instant,
}

impl Revealer {
    pub fn new(tick_period: Duration) -> Self {
        Revealer {
            displayed_text: String::new(),
            cursor: 0,
            tick_period,
            last_tick: Instant::now(),
        }
    }

    pub fn with_default_period() -> Self {
        Self::new(Duration::from_millis(reveal::DEFAULT_TICK_MS))
    }

    /// Sample the transcript state. A loading run start resets the reveal;
    /// committed text replaced wholesale (the error-message case) resyncs it
    /// by restarting from zero, keeping the prefix invariant.
    pub fn observe(&mut self, committed_text: &str, is_loading: bool) {
        if is_loading || !committed_text.starts_with(&self.displayed_text) {
            self.reset();
        }
    }

    fn reset(&mut self) {
        self.displayed_text.clear();
        self.cursor = 0;
    }

    /// Reveal exactly one additional character if the cursor is behind.
    /// Returns the revealed character, or None when caught up.
    pub fn tick(&mut self, committed_text: &str) -> Option<char> {
        // Self-heal if the caller skipped `observe` after a replacement
        if !committed_text.starts_with(&self.displayed_text) {
            self.reset();
        }

        let next = committed_text.chars().nth(self.cursor)?;
        self.cursor += 1;
        self.displayed_text.push(next);
        Some(next)
    }

    /// Time-gated sampling plus tick, for the polling event loop
    pub fn tick_if_due(&mut self, committed_text: &str, is_loading: bool) -> Option<char> {
        self.observe(committed_text, is_loading);
        if is_loading {
            return None;
        }

        let now = Instant::now();
        if now.duration_since(self.last_tick) >= self.tick_period {
            self.last_tick = now;
            self.tick(committed_text)
        } else {
            None
        }
    }

    /// Synchronous fallback for hosts that cannot schedule timers: expose the
    /// whole transcript immediately. Explicit degraded behavior, never silent.
    pub fn reveal_all(&mut self, committed_text: &str) {
        self.displayed_text = committed_text.to_string();
        self.cursor = committed_text.chars().count();
    }

    pub fn displayed_text(&self) -> &str {
        &self.displayed_text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_caught_up(&self, committed_text: &str) -> bool {
        self.cursor >= committed_text.chars().count()
    }
}

impl Default for Revealer {
    fn default() -> Self {
        Self::with_default_period()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ticking(tick_period_ms: u64) -> Revealer {
        Revealer::new(Duration::from_millis(tick_period_ms))
    }

    #[test]
    fn test_reveals_one_char_per_tick() {
        let mut revealer = ticking(15);
        let committed = "Hi!";

        assert_eq!(revealer.tick(committed), Some('H'));
        assert_eq!(revealer.tick(committed), Some('i'));
        assert_eq!(revealer.tick(committed), Some('!'));
        assert_eq!(revealer.tick(committed), None);

        assert_eq!(revealer.displayed_text(), "Hi!");
        assert!(revealer.is_caught_up(committed));
    }

    #[test]
    fn test_loading_resets_reveal() {
        let mut revealer = ticking(15);
        revealer.tick("Hello");
        revealer.tick("Hello");
        assert_eq!(revealer.displayed_text(), "He");

        revealer.observe("", true);

        assert_eq!(revealer.displayed_text(), "");
        assert_eq!(revealer.cursor(), 0);
    }

    #[test]
    fn test_resumes_from_cursor_when_transcript_grows() {
        let mut revealer = ticking(15);
        let first = "Hello";
        for _ in 0..5 {
            revealer.tick(first);
        }
        assert!(revealer.is_caught_up(first));

        // Transcript grows after the reveal had caught up
        let grown = "Hello world";
        revealer.observe(grown, false);
        assert_eq!(revealer.cursor(), 5);

        assert_eq!(revealer.tick(grown), Some(' '));
        assert_eq!(revealer.tick(grown), Some('w'));
        assert_eq!(revealer.displayed_text(), "Hello w");
    }

    #[test]
    fn test_wholesale_replacement_restarts_reveal() {
        let mut revealer = ticking(15);
        for _ in 0..4 {
            revealer.tick("partial text");
        }
        assert_eq!(revealer.displayed_text(), "part");

        // Error path replaces the committed text entirely
        let error_text = "Error: timeout";
        revealer.observe(error_text, false);
        assert_eq!(revealer.cursor(), 0);

        assert_eq!(revealer.tick(error_text), Some('E'));
    }

    #[test]
    fn test_reveal_all_fallback() {
        let mut revealer = ticking(15);
        revealer.reveal_all("Hello world");

        assert_eq!(revealer.displayed_text(), "Hello world");
        assert!(revealer.is_caught_up("Hello world"));
        assert_eq!(revealer.tick("Hello world"), None);
    }

    #[test]
    fn test_multibyte_characters_revealed_whole() {
        let mut revealer = ticking(15);
        let committed = "héllo wörld";

        let mut revealed = String::new();
        while let Some(c) = revealer.tick(committed) {
            revealed.push(c);
        }

        assert_eq!(revealed, committed);
        assert_eq!(revealer.cursor(), committed.chars().count());
    }
}
