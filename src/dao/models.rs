use std::fmt;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::transport::UserId;

/// Identifier assigned by the store to a quiz session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Persisted session row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDetails {
    /// Store-assigned identifier.
    pub id: SessionId,
    /// When the session was opened.
    pub start_time: OffsetDateTime,
    /// When the session was closed, `None` while still open.
    pub end_time: Option<OffsetDateTime>,
}

/// One row of a session leaderboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardEntry {
    /// Player the score belongs to.
    pub user: UserId,
    /// Accumulated score for the session; may be negative.
    pub score: i64,
}
