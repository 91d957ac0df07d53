//! Terminal surface for streamed output.
//!
//! The client renders its [`LineAccumulator`](super::LineAccumulator) into a
//! [`StreamDisplay`] while chunks arrive. Redraws are rate limited by a
//! [`RefreshThrottle`] so a fast model does not flood the terminal; the last
//! render is always drawn by `finish`.

use std::io;
use std::time::{Duration, Instant};

use console::{style, Term};

use super::config::DisplayMode;

/// Width used when stdout is not a terminal and none is configured.
pub const FALLBACK_WIDTH: usize = 80;

/// Something that can show the in-progress response.
pub trait StreamDisplay: Send {
    /// Replace what is on screen with `rendered`.
    fn refresh(&mut self, rendered: &str) -> io::Result<()>;

    /// Draw the final text and leave it in place.
    fn finish(&mut self, rendered: &str) -> io::Result<()>;
}

/// Resolve the display for one request.
pub fn open_display(mode: DisplayMode) -> Box<dyn StreamDisplay> {
    let term = Term::stdout();
    match mode {
        DisplayMode::Quiet => Box::new(QuietDisplay),
        DisplayMode::Auto if !term.is_term() => Box::new(QuietDisplay),
        DisplayMode::Auto | DisplayMode::Live => Box::new(LiveDisplay::new(term)),
    }
}

/// Current terminal width in columns, or [`FALLBACK_WIDTH`].
pub fn terminal_width() -> usize {
    let term = Term::stdout();
    if !term.is_term() {
        return FALLBACK_WIDTH;
    }
    let (_rows, cols) = term.size();
    if cols == 0 {
        FALLBACK_WIDTH
    } else {
        usize::from(cols)
    }
}

// ─── Live ────────────────────────────────────────────────────────────────────

/// Redraws the response in place on stdout.
///
/// While streaming only the tail that fits on screen is drawn: rows that
/// scroll into the terminal's scrollback can no longer be cleared. `finish`
/// replaces that region with the whole text once.
pub struct LiveDisplay {
    term: Term,
    /// Terminal rows occupied by the previous draw.
    drawn_rows: usize,
}

impl LiveDisplay {
    pub fn new(term: Term) -> Self {
        Self { term, drawn_rows: 0 }
    }

    fn draw(&mut self, text: &str, cols: usize) -> io::Result<()> {
        if self.drawn_rows > 0 {
            self.term.clear_last_lines(self.drawn_rows)?;
        }
        for line in text.split('\n') {
            self.term
                .write_line(&style(line).yellow().bold().to_string())?;
        }
        self.drawn_rows = occupied_rows(text, cols);
        self.term.flush()
    }
}

impl StreamDisplay for LiveDisplay {
    fn refresh(&mut self, rendered: &str) -> io::Result<()> {
        let (rows, cols) = self.term.size();
        let cols = usize::from(cols).max(1);
        // Keep one row free for the cursor.
        let max_rows = usize::from(rows).saturating_sub(1).max(1);
        self.draw(visible_tail(rendered, cols, max_rows), cols)
    }

    fn finish(&mut self, rendered: &str) -> io::Result<()> {
        let cols = usize::from(self.term.size().1).max(1);
        self.draw(rendered, cols)?;
        self.drawn_rows = 0;
        Ok(())
    }
}

/// Rows one line takes once the terminal soft-wraps it at `cols`.
fn line_rows(line: &str, cols: usize) -> usize {
    console::measure_text_width(line).div_ceil(cols).max(1)
}

/// Rows `text` takes once the terminal soft-wraps lines wider than `cols`.
fn occupied_rows(text: &str, cols: usize) -> usize {
    text.split('\n').map(|line| line_rows(line, cols)).sum()
}

/// The longest suffix of `text` made of whole lines that fits in `max_rows`.
///
/// When even the last line is taller than `max_rows`, its trailing
/// `cols * max_rows` characters are kept instead.
fn visible_tail(text: &str, cols: usize, max_rows: usize) -> &str {
    let line_starts: Vec<usize> = std::iter::once(0)
        .chain(text.match_indices('\n').map(|(i, _)| i + 1))
        .collect();

    let mut end = text.len();
    let mut rows = 0;
    for &start in line_starts.iter().rev() {
        let line = &text[start..end];
        let needed = line_rows(line, cols);
        if rows + needed > max_rows {
            if rows == 0 {
                return char_tail(line, cols * max_rows);
            }
            // `end` sits on the newline before the first kept line.
            return &text[end + 1..];
        }
        rows += needed;
        end = start.saturating_sub(1);
    }
    text
}

/// The last `max_chars` characters of `line`.
fn char_tail(line: &str, max_chars: usize) -> &str {
    let skip = line.chars().count().saturating_sub(max_chars);
    match line.char_indices().nth(skip) {
        Some((i, _)) => &line[i..],
        None => "",
    }
}

// ─── Quiet ───────────────────────────────────────────────────────────────────

/// Discards everything. Used for non-terminal output and in tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct QuietDisplay;

impl StreamDisplay for QuietDisplay {
    fn refresh(&mut self, _rendered: &str) -> io::Result<()> {
        Ok(())
    }

    fn finish(&mut self, _rendered: &str) -> io::Result<()> {
        Ok(())
    }
}

// ─── Throttle ────────────────────────────────────────────────────────────────

/// Allows at most one refresh per interval.
#[derive(Debug, Clone)]
pub struct RefreshThrottle {
    interval: Duration,
    last: Option<Instant>,
}

impl RefreshThrottle {
    /// A throttle allowing `rate` refreshes per second (minimum 1).
    pub fn per_second(rate: u32) -> Self {
        Self {
            interval: Duration::from_secs(1) / rate.max(1),
            last: None,
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Whether a refresh may happen at `now`. Records it if so.
    pub fn ready(&mut self, now: Instant) -> bool {
        match self.last {
            Some(last) if now.saturating_duration_since(last) < self.interval => false,
            _ => {
                self.last = Some(now);
                true
            }
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
