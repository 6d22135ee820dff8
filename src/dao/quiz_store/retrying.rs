use std::sync::Arc;

use futures::future::BoxFuture;

use crate::dao::models::{LeaderboardEntry, SessionDetails, SessionId};
use crate::dao::storage::StorageResult;
use crate::retry::RetryPolicy;
use crate::transport::UserId;

use super::QuizStore;

/// Decorator running every store call under a [`RetryPolicy`].
///
/// Only [`StorageError::Transient`](crate::dao::storage::StorageError::Transient) failures are
/// repeated. `update_score` is retried as a whole (read then write), so a failure between the
/// two steps replays the read against the latest row.
#[derive(Clone)]
pub struct RetryingStore {
    inner: Arc<dyn QuizStore>,
    policy: RetryPolicy,
}

impl RetryingStore {
    /// Wrap `inner`, retrying transient failures per `policy`.
    pub fn new(inner: Arc<dyn QuizStore>, policy: RetryPolicy) -> Self {
        Self { inner, policy }
    }
}

impl QuizStore for RetryingStore {
    fn create_session(&self) -> BoxFuture<'static, StorageResult<SessionId>> {
        let this = self.clone();
        Box::pin(async move {
            this.policy
                .run("store.create_session", || this.inner.create_session())
                .await
        })
    }

    fn end_session(&self, id: SessionId) -> BoxFuture<'static, StorageResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            this.policy
                .run("store.end_session", || this.inner.end_session(id))
                .await
        })
    }

    fn session_details(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionDetails>>> {
        let this = self.clone();
        Box::pin(async move {
            this.policy
                .run("store.session_details", || this.inner.session_details(id))
                .await
        })
    }

    fn update_score(
        &self,
        user: UserId,
        session: SessionId,
        delta: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let this = self.clone();
        Box::pin(async move {
            this.policy
                .run("store.update_score", || {
                    this.inner.update_score(user, session, delta)
                })
                .await
        })
    }

    fn leaderboard(
        &self,
        session: SessionId,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>> {
        let this = self.clone();
        Box::pin(async move {
            this.policy
                .run("store.leaderboard", || this.inner.leaderboard(session, limit))
                .await
        })
    }

    fn find_open_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionId>>> {
        let this = self.clone();
        Box::pin(async move {
            this.policy
                .run("store.find_open_session", || this.inner.find_open_session())
                .await
        })
    }

    // Probed by the supervisor on its own schedule; a single attempt keeps degraded detection quick.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        self.inner.health_check()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::dao::storage::StorageError;
    use crate::testing::FakeStore;

    fn retrying(store: &FakeStore, attempts: u32) -> RetryingStore {
        RetryingStore::new(
            Arc::new(store.clone()),
            RetryPolicy::linear(attempts, Duration::ZERO),
        )
    }

    #[tokio::test]
    async fn transient_failures_are_absorbed() {
        let store = FakeStore::default();
        store.fail_next(2, true);

        let id = retrying(&store, 3).create_session().await.unwrap();

        assert_eq!(id, SessionId(1));
        assert_eq!(store.calls("create_session"), 3);
    }

    #[tokio::test]
    async fn permanent_failures_surface_immediately() {
        let store = FakeStore::default();
        store.fail_next(1, false);

        let err = retrying(&store, 5)
            .update_score(UserId(1), SessionId(1), 2)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Permanent { .. }));
        assert_eq!(store.calls("update_score"), 1);
    }
}
