mod retrying;
/// PostgREST-backed store.
pub mod supabase;

use futures::future::BoxFuture;

use crate::dao::models::{LeaderboardEntry, SessionDetails, SessionId};
use crate::dao::storage::StorageResult;
use crate::transport::UserId;

pub use retrying::RetryingStore;

/// Abstraction over the persistence layer for quiz sessions and scores.
pub trait QuizStore: Send + Sync {
    /// Open a new session stamped with the current time.
    fn create_session(&self) -> BoxFuture<'static, StorageResult<SessionId>>;
    /// Stamp the end time of a session.
    fn end_session(&self, id: SessionId) -> BoxFuture<'static, StorageResult<()>>;
    /// Start time and end time of a session, `None` when unknown.
    fn session_details(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionDetails>>>;
    /// Add `delta` to the player's score, creating the row with `delta` when missing.
    fn update_score(
        &self,
        user: UserId,
        session: SessionId,
        delta: i64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Highest scores first, at most `limit` rows.
    fn leaderboard(
        &self,
        session: SessionId,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>>;
    /// Most recently started session that was never closed.
    fn find_open_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionId>>>;
    /// Verify both tables are reachable.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
}
