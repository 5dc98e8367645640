use std::io::{self, Write};

/// Severity class attached to a status message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    Ok,
    Err,
}

impl Severity {
    pub fn as_class(&self) -> &'static str {
        match self {
            Severity::Ok => "ok",
            Severity::Err => "err",
        }
    }
}

/// Output sink for everything a session wants shown to the player.
///
/// The session only ever calls these five capabilities; how they end up on
/// screen (plain lines, a TUI widget, a web page) is the sink's business.
pub trait DisplaySink {
    /// Append a word to the found-words list.
    fn word_found(&mut self, word: &str);
    /// Show the current score.
    fn score(&mut self, score: u32);
    /// Show the seconds remaining on the countdown.
    fn countdown(&mut self, secs: u32);
    /// Show a transient status message.
    fn status(&mut self, msg: &str, severity: Severity);
    /// Stop accepting word submissions (the game is over).
    fn hide_submission_surface(&mut self);
}

/// Production sink writing plain lines to stdout.
///
/// Write errors are swallowed; the sink is side-effect-only and a broken
/// pipe should not take the session down with it.
#[derive(Debug)]
pub struct StdoutDisplay {
    out: io::Stdout,
}

impl StdoutDisplay {
    pub fn new() -> Self {
        Self { out: io::stdout() }
    }
}

impl Default for StdoutDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplaySink for StdoutDisplay {
    fn word_found(&mut self, word: &str) {
        let _ = writeln!(self.out, "  + {word}");
    }

    fn score(&mut self, score: u32) {
        let _ = writeln!(self.out, "score: {score}");
    }

    fn countdown(&mut self, secs: u32) {
        let _ = writeln!(self.out, "{secs}s left");
    }

    fn status(&mut self, msg: &str, severity: Severity) {
        let _ = writeln!(self.out, "[{}] {msg}", severity.as_class());
    }

    fn hide_submission_surface(&mut self) {
        let _ = writeln!(self.out, "--- time's up ---");
    }
}

/// Recording sink for unit and integration tests.
#[derive(Debug, Default)]
pub struct RecordingSink {
    pub words: Vec<String>,
    pub scores: Vec<u32>,
    pub countdowns: Vec<u32>,
    pub statuses: Vec<(String, Severity)>,
    pub surface_hidden: bool,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last status message shown, if any.
    pub fn last_status(&self) -> Option<&(String, Severity)> {
        self.statuses.last()
    }
}

impl DisplaySink for RecordingSink {
    fn word_found(&mut self, word: &str) {
        self.words.push(word.to_string());
    }

    fn score(&mut self, score: u32) {
        self.scores.push(score);
    }

    fn countdown(&mut self, secs: u32) {
        self.countdowns.push(secs);
    }

    fn status(&mut self, msg: &str, severity: Severity) {
        self.statuses.push((msg.to_string(), severity));
    }

    fn hide_submission_surface(&mut self) {
        self.surface_hidden = true;
    }
}
