use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::dao::models::{LeaderboardEntry, SessionDetails, SessionId};
use crate::transport::UserId;

pub const SESSIONS_TABLE: &str = "quiz_sessions";
pub const SCORES_TABLE: &str = "scores";

#[derive(Debug, Serialize)]
pub struct NewSessionRow {
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct SessionEndPatch {
    #[serde(with = "time::serde::rfc3339")]
    pub end_time: OffsetDateTime,
}

#[derive(Debug, Deserialize)]
pub struct SessionRow {
    pub session_id: SessionId,
    #[serde(with = "time::serde::rfc3339")]
    pub start_time: OffsetDateTime,
    #[serde(default, with = "time::serde::rfc3339::option")]
    pub end_time: Option<OffsetDateTime>,
}

impl From<SessionRow> for SessionDetails {
    fn from(row: SessionRow) -> Self {
        Self {
            id: row.session_id,
            start_time: row.start_time,
            end_time: row.end_time,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SessionIdRow {
    pub session_id: SessionId,
}

/// `user_id` is stored as text; snowflakes overflow a signed 64-bit column.
#[derive(Debug, Serialize, Deserialize)]
pub struct ScoreRow {
    pub user_id: UserId,
    pub session_id: SessionId,
    pub score: i64,
}

impl From<ScoreRow> for LeaderboardEntry {
    fn from(row: ScoreRow) -> Self {
        Self {
            user: row.user_id,
            score: row.score,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ScorePatch {
    pub score: i64,
}
