use std::collections::HashSet;
use std::fs::OpenOptions;
use std::io::{self, Write};

use chrono::prelude::*;
use directories::ProjectDirs;
use thiserror::Error;
use tracing::{debug, warn};

use crate::display::{DisplaySink, Severity};
use crate::judge::Verdict;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("game duration must be a positive number of seconds")]
    InvalidConfiguration,
}

/// Whether the session is still accepting ticks and submissions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Phase {
    Active,
    Ended,
}

/// Normalization applied to every submitted word before the duplicate gate
/// and the judge request. The judge's dictionary is lowercase, so lowercase
/// plus trim keeps the local gate and the remote match consistent.
pub fn normalize(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// One play-through: a countdown, a score, and the set of accepted words.
///
/// All mutation happens through the handlers below, called from a single
/// game loop. The repeating tick itself is owned by the runtime
/// (`runtime::TickHandle`); `tick` returning `Some(score)` is the signal to
/// stop it and post the frozen final score, exactly once.
#[derive(Debug)]
pub struct Session<D: DisplaySink> {
    display: D,
    secs_remaining: u32,
    score: u32,
    found: HashSet<String>,
    pending: HashSet<String>,
    phase: Phase,
    score_reported: bool,
}

impl<D: DisplaySink> Session<D> {
    pub fn new(mut display: D, secs: u32) -> Result<Self, SessionError> {
        if secs == 0 {
            return Err(SessionError::InvalidConfiguration);
        }
        display.countdown(secs);
        Ok(Self {
            display,
            secs_remaining: secs,
            score: 0,
            found: HashSet::new(),
            pending: HashSet::new(),
            phase: Phase::Active,
            score_reported: false,
        })
    }

    /// One second has passed. Returns the frozen final score on the single
    /// Active -> Ended transition; `None` on every other call.
    pub fn tick(&mut self) -> Option<u32> {
        if self.phase == Phase::Ended {
            return None;
        }
        self.secs_remaining = self.secs_remaining.saturating_sub(1);
        self.display.countdown(self.secs_remaining);
        if self.secs_remaining == 0 {
            self.phase = Phase::Ended;
            self.display.hide_submission_surface();
            let _ = self.save_results();
            return Some(self.score);
        }
        None
    }

    /// Handle a raw word submission. Returns the normalized word when a
    /// validity check should be dispatched for it; empty input, duplicates
    /// (accepted or still in flight) and post-game submissions return `None`.
    pub fn submit(&mut self, raw: &str) -> Option<String> {
        if self.phase == Phase::Ended {
            debug!(word = raw, "submission after game end ignored");
            return None;
        }
        let word = normalize(raw);
        if word.is_empty() {
            return None;
        }
        if self.found.contains(&word) || self.pending.contains(&word) {
            self.display
                .status(&format!("Already found {word}"), Severity::Err);
            return None;
        }
        self.pending.insert(word.clone());
        Some(word)
    }

    /// Apply the judge's verdict for a previously dispatched word. Verdicts
    /// that arrive after the game has ended are dropped so a late acceptance
    /// can never move the score past what was posted.
    pub fn on_verdict(&mut self, word: &str, verdict: Verdict) {
        if self.phase == Phase::Ended {
            debug!(word, "dropping verdict that arrived after game end");
            return;
        }
        self.pending.remove(word);
        match verdict {
            Verdict::NotWord => self
                .display
                .status(&format!("{word} is not a valid English word"), Severity::Err),
            Verdict::NotOnBoard => self.display.status(
                &format!("{word} is not a valid word on this board"),
                Severity::Err,
            ),
            Verdict::Accepted => {
                if !self.found.insert(word.to_string()) {
                    return;
                }
                self.score += word.chars().count() as u32;
                self.display.word_found(word);
                self.display.score(self.score);
                self.display.status(&format!("Added: {word}"), Severity::Ok);
            }
        }
    }

    /// The validity check for `word` failed in transit. Clearing it from the
    /// in-flight set lets the player simply resubmit.
    pub fn on_check_failed(&mut self, word: &str) {
        if self.phase == Phase::Ended {
            return;
        }
        self.pending.remove(word);
        warn!(word, "word check failed; submit again to retry");
    }

    /// The judge acknowledged the posted score. Shows the final message;
    /// fires at most once.
    pub fn on_score_recorded(&mut self, broke_record: bool) {
        if self.phase != Phase::Ended || self.score_reported {
            return;
        }
        self.score_reported = true;
        let msg = if broke_record {
            format!("New record: {}", self.score)
        } else {
            format!("Final score: {}", self.score)
        };
        self.display.status(&msg, Severity::Ok);
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn secs_remaining(&self) -> u32 {
        self.secs_remaining
    }

    pub fn has_found(&self, word: &str) -> bool {
        self.found.contains(word)
    }

    pub fn words_found(&self) -> usize {
        self.found.len()
    }

    pub fn display(&self) -> &D {
        &self.display
    }

    /// Append a line for this game to the local results log.
    pub fn save_results(&self) -> io::Result<()> {
        if let Some(proj_dirs) = ProjectDirs::from("", "", "wordrush") {
            let config_dir = proj_dirs.config_dir();
            let log_path = config_dir.join("games.csv");

            std::fs::create_dir_all(config_dir)?;

            // If the log file doesn't exist, we need to emit a header
            let needs_header = !log_path.exists();

            let mut log_file = OpenOptions::new()
                .write(true)
                .append(true)
                .create(true)
                .open(log_path)?;

            if needs_header {
                writeln!(log_file, "date,words,score")?;
            }

            writeln!(
                log_file,
                "{},{},{}",
                Local::now().format("%c"),
                self.found.len(),
                self.score,
            )?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::display::RecordingSink;
    use assert_matches::assert_matches;

    fn session(secs: u32) -> Session<RecordingSink> {
        Session::new(RecordingSink::new(), secs).unwrap()
    }

    /// Submit and immediately accept, as if the judge answered instantly.
    fn accept(session: &mut Session<RecordingSink>, raw: &str) {
        let word = session.submit(raw).expect("submission should dispatch");
        session.on_verdict(&word, Verdict::Accepted);
    }

    #[test]
    fn new_renders_initial_countdown() {
        let s = session(60);
        assert_eq!(s.secs_remaining(), 60);
        assert_eq!(s.score(), 0);
        assert_eq!(s.phase(), Phase::Active);
        assert_eq!(s.display().countdowns, vec![60]);
    }

    #[test]
    fn zero_duration_is_rejected() {
        let result = Session::new(RecordingSink::new(), 0);
        assert_matches!(result, Err(SessionError::InvalidConfiguration));
    }

    #[test]
    fn normalize_lowercases_and_trims() {
        assert_eq!(normalize("  CAT "), "cat");
        assert_eq!(normalize("dog"), "dog");
        assert_eq!(normalize("   "), "");
    }

    #[test]
    fn tick_decrements_and_renders() {
        let mut s = session(3);
        assert_eq!(s.tick(), None);
        assert_eq!(s.secs_remaining(), 2);
        assert_eq!(s.display().countdowns, vec![3, 2]);
    }

    #[test]
    fn session_ends_after_exactly_duration_ticks() {
        let mut s = session(3);
        assert_eq!(s.tick(), None);
        assert_eq!(s.tick(), None);
        assert_eq!(s.tick(), Some(0));
        assert_eq!(s.phase(), Phase::Ended);
        assert!(s.display().surface_hidden);

        // Defensive: a stray tick after the transition changes nothing.
        assert_eq!(s.tick(), None);
        assert_eq!(s.secs_remaining(), 0);
        assert_eq!(s.display().countdowns, vec![3, 2, 1, 0]);
    }

    #[test]
    fn final_score_is_frozen_at_transition() {
        let mut s = session(1);
        accept(&mut s, "cat");
        assert_eq!(s.tick(), Some(3));
    }

    #[test]
    fn empty_submission_is_silently_ignored() {
        let mut s = session(60);
        assert_eq!(s.submit(""), None);
        assert_eq!(s.submit("   "), None);
        assert!(s.display().statuses.is_empty());
    }

    #[test]
    fn accepted_word_scores_its_length() {
        let mut s = session(60);
        accept(&mut s, "cat");

        assert_eq!(s.score(), 3);
        assert!(s.has_found("cat"));
        assert_eq!(s.display().words, vec!["cat".to_string()]);
        assert_eq!(s.display().scores, vec![3]);
        assert_eq!(
            s.display().last_status(),
            Some(&("Added: cat".to_string(), Severity::Ok))
        );
    }

    #[test]
    fn duplicate_submission_is_rejected_locally() {
        let mut s = session(60);
        accept(&mut s, "cat");

        // Second submission never makes it to the judge.
        assert_eq!(s.submit("cat"), None);
        assert_eq!(s.score(), 3);
        assert_eq!(
            s.display().last_status(),
            Some(&("Already found cat".to_string(), Severity::Err))
        );
    }

    #[test]
    fn duplicate_gate_is_case_and_whitespace_insensitive() {
        let mut s = session(60);
        accept(&mut s, "cat");
        assert_eq!(s.submit(" CAT "), None);
        assert_eq!(s.score(), 3);
    }

    #[test]
    fn duplicate_while_check_in_flight_is_not_dispatched_twice() {
        let mut s = session(60);
        assert_eq!(s.submit("pen"), Some("pen".to_string()));

        // First check still in flight; resubmitting must not dispatch again.
        assert_eq!(s.submit("pen"), None);
        assert_eq!(
            s.display().last_status(),
            Some(&("Already found pen".to_string(), Severity::Err))
        );

        s.on_verdict("pen", Verdict::Accepted);
        assert_eq!(s.score(), 3);
    }

    #[test]
    fn not_word_rejection_leaves_state_untouched() {
        let mut s = session(60);
        let word = s.submit("zzzz").unwrap();
        s.on_verdict(&word, Verdict::NotWord);

        assert_eq!(s.score(), 0);
        assert!(!s.has_found("zzzz"));
        assert_eq!(
            s.display().last_status(),
            Some(&("zzzz is not a valid English word".to_string(), Severity::Err))
        );
    }

    #[test]
    fn not_on_board_rejection_leaves_state_untouched() {
        let mut s = session(60);
        let word = s.submit("dog").unwrap();
        s.on_verdict(&word, Verdict::NotOnBoard);

        assert_eq!(s.score(), 0);
        assert_eq!(
            s.display().last_status(),
            Some(&("dog is not a valid word on this board".to_string(), Severity::Err))
        );
    }

    #[test]
    fn rejected_word_can_be_resubmitted() {
        let mut s = session(60);
        let word = s.submit("dog").unwrap();
        s.on_verdict(&word, Verdict::NotOnBoard);

        // Rejection cleared the in-flight entry, so a retry dispatches again.
        assert_eq!(s.submit("dog"), Some("dog".to_string()));
    }

    #[test]
    fn failed_check_can_be_retried() {
        let mut s = session(60);
        let word = s.submit("pen").unwrap();
        s.on_check_failed(&word);

        assert_eq!(s.submit("pen"), Some("pen".to_string()));
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn late_acceptance_after_end_is_dropped() {
        let mut s = session(1);
        let word = s.submit("pen").unwrap();
        assert_eq!(s.tick(), Some(0));

        // The response for "pen" arrives after the transition.
        s.on_verdict(&word, Verdict::Accepted);
        assert_eq!(s.score(), 0);
        assert!(!s.has_found("pen"));
        assert!(s.display().words.is_empty());
    }

    #[test]
    fn submission_after_end_is_ignored() {
        let mut s = session(1);
        assert_eq!(s.tick(), Some(0));
        assert_eq!(s.submit("cat"), None);
        assert_eq!(s.score(), 0);
    }

    #[test]
    fn score_accounting_sums_accepted_lengths() {
        let mut s = session(60);
        accept(&mut s, "cat");
        accept(&mut s, "horse");
        let word = s.submit("zzzz").unwrap();
        s.on_verdict(&word, Verdict::NotWord);
        s.submit("cat");

        assert_eq!(s.score(), 3 + 5);
        assert_eq!(s.words_found(), 2);
    }

    #[test]
    fn final_message_reflects_record_flag() {
        let mut s = session(1);
        accept(&mut s, "cat");
        s.tick();
        s.on_score_recorded(true);
        assert_eq!(
            s.display().last_status(),
            Some(&("New record: 3".to_string(), Severity::Ok))
        );

        let mut s = session(1);
        s.tick();
        s.on_score_recorded(false);
        assert_eq!(
            s.display().last_status(),
            Some(&("Final score: 0".to_string(), Severity::Ok))
        );
    }

    #[test]
    fn score_recorded_fires_at_most_once() {
        let mut s = session(1);
        s.tick();
        s.on_score_recorded(false);
        s.on_score_recorded(true);

        let finals = s
            .display()
            .statuses
            .iter()
            .filter(|(m, _)| m.contains("score") || m.contains("record"))
            .count();
        assert_eq!(finals, 1);
    }

    #[test]
    fn score_recorded_before_end_is_ignored() {
        let mut s = session(60);
        s.on_score_recorded(true);
        assert!(s.display().statuses.is_empty());
    }
}
