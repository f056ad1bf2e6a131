use serde::{Deserialize, Serialize};
use std::fmt;

/// Score recorded for a game whose outcome is not known yet.
pub const PLACEHOLDER_SCORE: i64 = -1;

/// One stored game: two teams, their scores and the day it was played.
///
/// Team order is whatever the first writer used; lookups treat the pair as
/// unordered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameRecord {
    pub team1: String,
    pub team1_score: i64,
    pub team2: String,
    pub team2_score: i64,
    /// Truncated day key from the feed, e.g. "Jan 5"
    pub date: String,
}

impl GameRecord {
    /// True while either side still carries the placeholder score.
    pub fn is_placeholder(&self) -> bool {
        self.team1_score == PLACEHOLDER_SCORE || self.team2_score == PLACEHOLDER_SCORE
    }
}

/// Renders a row the way `/checkDatabase` lists it: `('Lakers', 101, 'Celtics', 99, 'Jan 5')`.
impl fmt::Display for GameRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "('{}', {}, '{}', {}, '{}')",
            self.team1, self.team1_score, self.team2, self.team2_score, self.date
        )
    }
}

/// An incoming result to be reconciled into the store.
///
/// `team1_score` belongs to `team1` and `team2_score` to `team2`, regardless of
/// the order the matching record was stored in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameResult {
    pub date: String,
    pub team1: String,
    pub team1_score: i64,
    pub team2: String,
    pub team2_score: i64,
}

impl GameResult {
    /// A bet registered before the game is played.
    pub fn placeholder(date: &str, team1: &str, team2: &str) -> Self {
        GameResult {
            date: date.to_string(),
            team1: team1.to_string(),
            team1_score: PLACEHOLDER_SCORE,
            team2: team2.to_string(),
            team2_score: PLACEHOLDER_SCORE,
        }
    }

    pub fn is_placeholder(&self) -> bool {
        self.team1_score == PLACEHOLDER_SCORE || self.team2_score == PLACEHOLDER_SCORE
    }

    pub fn into_record(self) -> GameRecord {
        GameRecord {
            team1: self.team1,
            team1_score: self.team1_score,
            team2: self.team2,
            team2_score: self.team2_score,
            date: self.date,
        }
    }
}

/// JSON body of `/getGameInfo`; every value is sent as a string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameInfo {
    #[serde(rename = "Team1")]
    pub team1: String,
    #[serde(rename = "Team1Score")]
    pub team1_score: String,
    #[serde(rename = "Team2")]
    pub team2: String,
    #[serde(rename = "Team2Score")]
    pub team2_score: String,
    #[serde(rename = "Date")]
    pub date: String,
}

impl From<GameRecord> for GameInfo {
    fn from(r: GameRecord) -> Self {
        GameInfo {
            team1: r.team1,
            team1_score: r.team1_score.to_string(),
            team2: r.team2,
            team2_score: r.team2_score.to_string(),
            date: r.date,
        }
    }
}

/// Result of dropping the games table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClearOutcome {
    Removed,
    NoSuchTable,
}
