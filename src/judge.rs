use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Timeout for a single judge round-trip; a stuck request would otherwise
/// pin its worker thread for the rest of the session.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("judge request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Judge's answer to a check-word request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Verdict {
    Accepted,
    NotWord,
    NotOnBoard,
}

impl Verdict {
    /// Map the judge's result tag. Only the two rejection tags are
    /// meaningful; anything else counts as acceptance.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "not-word" => Verdict::NotWord,
            "not-on-board" => Verdict::NotOnBoard,
            _ => Verdict::Accepted,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CheckWordResponse {
    result: String,
}

#[derive(Debug, Serialize)]
struct PostScoreRequest {
    score: u32,
}

#[derive(Debug, Deserialize)]
struct PostScoreResponse {
    #[serde(rename = "brokeRecord")]
    broke_record: bool,
}

/// Remote service authoritative for word validity and record-keeping.
///
/// Calls block; the runtime fans them out to worker threads so the game
/// loop never waits on the network.
pub trait Judge: Send + Sync {
    /// Is `word` a real word that can be traced on the current board?
    fn check_word(&self, word: &str) -> Result<Verdict, JudgeError>;
    /// Report the final score; returns whether it broke the standing record.
    fn post_score(&self, score: u32) -> Result<bool, JudgeError>;
}

/// HTTP judge client speaking the original service's wire contract:
/// `GET /check-word?word=..` and `POST /post-score {"score": n}`.
#[derive(Debug, Clone)]
pub struct HttpJudge {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl HttpJudge {
    pub fn new(base_url: impl Into<String>) -> Result<Self, JudgeError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

impl Judge for HttpJudge {
    fn check_word(&self, word: &str) -> Result<Verdict, JudgeError> {
        let resp: CheckWordResponse = self
            .http
            .get(format!("{}/check-word", self.base_url))
            .query(&[("word", word)])
            .send()?
            .error_for_status()?
            .json()?;
        Ok(Verdict::from_tag(&resp.result))
    }

    fn post_score(&self, score: u32) -> Result<bool, JudgeError> {
        let resp: PostScoreResponse = self
            .http
            .post(format!("{}/post-score", self.base_url))
            .json(&PostScoreRequest { score })
            .send()?
            .error_for_status()?
            .json()?;
        Ok(resp.broke_record)
    }
}
