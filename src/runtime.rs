use std::io::{self, BufRead};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, Sender};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::warn;

use crate::display::DisplaySink;
use crate::judge::{Judge, Verdict};
use crate::session::Session;

/// Unified event type consumed by the game loop
#[derive(Clone, Debug)]
pub enum GameEvent {
    Tick,
    Submit(String),
    Checked { word: String, verdict: Verdict },
    CheckFailed { word: String },
    Scored { broke_record: bool },
    ScoreFailed,
    Quit,
}

/// Source of game events (ticks, submissions, judge replies)
pub trait GameEventSource {
    /// Block for the next event; `None` once every sender is gone.
    fn recv(&self) -> Option<GameEvent>;
}

/// Production event source backed by an mpsc channel shared by the ticker,
/// the input reader, and the judge dispatch workers.
pub struct ChannelEventSource {
    rx: Receiver<GameEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl GameEventSource for ChannelEventSource {
    fn recv(&self) -> Option<GameEvent> {
        self.rx.recv().ok()
    }
}

/// Reads word submissions line by line from stdin. EOF (or a read error)
/// turns into `Quit` so closing the input abandons the game.
pub fn spawn_stdin_reader(tx: Sender<GameEvent>) {
    thread::spawn(move || {
        let stdin = io::stdin();
        for line in stdin.lock().lines() {
            match line {
                Ok(word) => {
                    if tx.send(GameEvent::Submit(word)).is_err() {
                        return;
                    }
                }
                Err(_) => break,
            }
        }
        let _ = tx.send(GameEvent::Quit);
    });
}

/// Owned handle to the repeating countdown tick.
///
/// The backing thread sends `Tick` at the given interval until `stop` is
/// called; dropping the handle stops it too, so the clock can never outlive
/// the loop that owns it.
pub struct TickHandle {
    stopped: Arc<AtomicBool>,
}

impl TickHandle {
    pub fn spawn(tx: Sender<GameEvent>, interval: Duration) -> Self {
        let stopped = Arc::new(AtomicBool::new(false));
        let flag = stopped.clone();
        thread::spawn(move || loop {
            thread::sleep(interval);
            if flag.load(Ordering::Relaxed) || tx.send(GameEvent::Tick).is_err() {
                break;
            }
        });
        Self { stopped }
    }

    pub fn stop(&self) {
        self.stopped.store(true, Ordering::Relaxed);
    }
}

impl Drop for TickHandle {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Fans judge round-trips out to worker threads; replies come back on the
/// event channel. Responses may arrive in any order relative to dispatch;
/// the session's phase gate sorts out anything that lands too late.
pub struct JudgeDispatcher {
    judge: Arc<dyn Judge>,
    tx: Sender<GameEvent>,
}

impl JudgeDispatcher {
    pub fn new(judge: Arc<dyn Judge>, tx: Sender<GameEvent>) -> Self {
        Self { judge, tx }
    }

    pub fn dispatch_check(&self, word: String) {
        let judge = self.judge.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let event = match judge.check_word(&word) {
                Ok(verdict) => GameEvent::Checked { word, verdict },
                Err(err) => {
                    warn!(%err, word, "check-word request failed");
                    GameEvent::CheckFailed { word }
                }
            };
            let _ = tx.send(event);
        });
    }

    pub fn dispatch_score(&self, score: u32) {
        let judge = self.judge.clone();
        let tx = self.tx.clone();
        thread::spawn(move || {
            let event = match judge.post_score(score) {
                Ok(broke_record) => GameEvent::Scored { broke_record },
                Err(err) => {
                    warn!(%err, score, "post-score request failed");
                    GameEvent::ScoreFailed
                }
            };
            let _ = tx.send(event);
        });
    }
}

/// Drives one session to completion: ticks and submissions in, verdicts
/// applied, final score posted exactly once. Returns the finished session
/// so callers (and tests) can inspect it.
pub fn run_session<D, E>(
    mut session: Session<D>,
    events: E,
    dispatcher: JudgeDispatcher,
    ticks: TickHandle,
) -> Session<D>
where
    D: DisplaySink,
    E: GameEventSource,
{
    while let Some(event) = events.recv() {
        match event {
            GameEvent::Tick => {
                if let Some(final_score) = session.tick() {
                    ticks.stop();
                    dispatcher.dispatch_score(final_score);
                }
            }
            GameEvent::Submit(raw) => {
                if let Some(word) = session.submit(&raw) {
                    dispatcher.dispatch_check(word);
                }
            }
            GameEvent::Checked { word, verdict } => session.on_verdict(&word, verdict),
            GameEvent::CheckFailed { word } => session.on_check_failed(&word),
            GameEvent::Scored { broke_record } => {
                session.on_score_recorded(broke_record);
                break;
            }
            // Degraded ending: the score never reached the judge, so there
            // is no final message to wait for.
            GameEvent::ScoreFailed => break,
            GameEvent::Quit => break,
        }
    }
    session
}
