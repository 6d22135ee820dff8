use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use reqwest::{Client, Method, header::AUTHORIZATION};
use serde::{Serialize, de::DeserializeOwned};
use time::OffsetDateTime;
use tokio::sync::Mutex;
use tracing::debug;

use crate::dao::{
    models::{LeaderboardEntry, SessionDetails, SessionId},
    quiz_store::QuizStore,
    storage::StorageResult,
};
use crate::transport::UserId;

use super::{
    config::SupabaseConfig,
    error::{SupabaseDaoError, SupabaseResult},
    models::{
        NewSessionRow, SCORES_TABLE, SESSIONS_TABLE, ScorePatch, ScoreRow, SessionEndPatch,
        SessionIdRow, SessionRow,
    },
};

const REST_PREFIX: &str = "rest/v1";

type ScoreKey = (UserId, SessionId);

/// [`QuizStore`] backed by Supabase's PostgREST gateway.
///
/// Score updates are read-then-write, so they are serialized per `(user, session)` across
/// clones of the store. A conflicting insert from another process falls back to a patch.
#[derive(Clone)]
pub struct SupabaseQuizStore {
    client: Client,
    base_url: Arc<str>,
    api_key: Arc<str>,
    score_locks: Arc<DashMap<ScoreKey, Arc<Mutex<()>>>>,
}

impl SupabaseQuizStore {
    /// Build the HTTP client; reachability is checked separately through `health_check`.
    pub fn new(config: SupabaseConfig) -> SupabaseResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| SupabaseDaoError::ClientBuilder { source })?;

        Ok(Self {
            client,
            base_url: Arc::from(config.base_url.trim_end_matches('/')),
            api_key: Arc::from(config.api_key),
            score_locks: Arc::new(DashMap::new()),
        })
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        let url = format!("{}/{}/{}", self.base_url, REST_PREFIX, table);
        self.client
            .request(method, url)
            .header("apikey", self.api_key.as_ref())
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
    }

    async fn execute(
        &self,
        table: &str,
        builder: reqwest::RequestBuilder,
    ) -> SupabaseResult<reqwest::Response> {
        let response = builder
            .send()
            .await
            .map_err(|source| SupabaseDaoError::RequestSend {
                path: table.to_string(),
                source,
            })?;

        let status = response.status();
        debug!(table, %status, "supabase request completed");
        if status.is_success() {
            Ok(response)
        } else {
            Err(SupabaseDaoError::RequestStatus {
                path: table.to_string(),
                status,
            })
        }
    }

    async fn select<T>(&self, table: &str, query: &[(&str, String)]) -> SupabaseResult<Vec<T>>
    where
        T: DeserializeOwned,
    {
        let builder = self.request(Method::GET, table).query(query);
        let response = self.execute(table, builder).await?;
        response
            .json::<Vec<T>>()
            .await
            .map_err(|source| SupabaseDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            })
    }

    async fn insert<B, T>(&self, table: &str, row: &B) -> SupabaseResult<T>
    where
        B: ?Sized + Serialize,
        T: DeserializeOwned,
    {
        let builder = self
            .request(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row);
        let response = self.execute(table, builder).await?;
        let mut rows = response
            .json::<Vec<T>>()
            .await
            .map_err(|source| SupabaseDaoError::DecodeResponse {
                path: table.to_string(),
                source,
            })?;
        rows.pop().ok_or_else(|| SupabaseDaoError::MissingRow {
            path: table.to_string(),
        })
    }

    async fn update<B>(&self, table: &str, filter: &[(&str, String)], patch: &B) -> SupabaseResult<()>
    where
        B: ?Sized + Serialize,
    {
        let builder = self
            .request(Method::PATCH, table)
            .query(filter)
            .json(patch);
        self.execute(table, builder).await.map(|_| ())
    }

    async fn current_score(&self, user: UserId, session: SessionId) -> SupabaseResult<Option<i64>> {
        let rows = self
            .select::<ScoreRow>(
                SCORES_TABLE,
                &[
                    ("select", "user_id,session_id,score".to_string()),
                    ("user_id", eq(user)),
                    ("session_id", eq(session)),
                ],
            )
            .await?;
        Ok(rows.into_iter().next().map(|row| row.score))
    }

    async fn set_score(&self, user: UserId, session: SessionId, score: i64) -> SupabaseResult<()> {
        self.update(
            SCORES_TABLE,
            &[("user_id", eq(user)), ("session_id", eq(session))],
            &ScorePatch { score },
        )
        .await
    }

    async fn apply_delta(&self, user: UserId, session: SessionId, delta: i64) -> SupabaseResult<()> {
        if let Some(current) = self.current_score(user, session).await? {
            return self.set_score(user, session, current + delta).await;
        }

        let row = ScoreRow {
            user_id: user,
            session_id: session,
            score: delta,
        };
        match self.insert::<_, ScoreRow>(SCORES_TABLE, &row).await {
            Ok(_) => Ok(()),
            Err(err) if err.is_conflict() => {
                debug!(%user, %session, "score row created concurrently, patching instead");
                let current = self.current_score(user, session).await?.ok_or(err)?;
                self.set_score(user, session, current + delta).await
            }
            Err(err) => Err(err),
        }
    }

    async fn locked_apply_delta(
        &self,
        user: UserId,
        session: SessionId,
        delta: i64,
    ) -> SupabaseResult<()> {
        let key = (user, session);
        let lock = self.score_locks.entry(key).or_default().clone();
        let result = {
            let _guard = lock.lock().await;
            self.apply_delta(user, session, delta).await
        };
        drop(lock);
        self.score_locks
            .remove_if(&key, |_, lock| Arc::strong_count(lock) == 1);
        result
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

impl QuizStore for SupabaseQuizStore {
    fn create_session(&self) -> BoxFuture<'static, StorageResult<SessionId>> {
        let store = self.clone();
        Box::pin(async move {
            let row = NewSessionRow {
                start_time: OffsetDateTime::now_utc(),
            };
            let created: SessionIdRow = store.insert(SESSIONS_TABLE, &row).await?;
            Ok(created.session_id)
        })
    }

    fn end_session(&self, id: SessionId) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let patch = SessionEndPatch {
                end_time: OffsetDateTime::now_utc(),
            };
            store
                .update(SESSIONS_TABLE, &[("session_id", eq(id))], &patch)
                .await
                .map_err(Into::into)
        })
    }

    fn session_details(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionDetails>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store
                .select::<SessionRow>(
                    SESSIONS_TABLE,
                    &[
                        ("select", "session_id,start_time,end_time".to_string()),
                        ("session_id", eq(id)),
                    ],
                )
                .await?;
            Ok(rows.into_iter().next().map(SessionDetails::from))
        })
    }

    fn update_score(
        &self,
        user: UserId,
        session: SessionId,
        delta: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store.locked_apply_delta(user, session, delta).await?;
            debug!(%user, %session, delta, "score updated");
            Ok(())
        })
    }

    fn leaderboard(
        &self,
        session: SessionId,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store
                .select::<ScoreRow>(
                    SCORES_TABLE,
                    &[
                        ("select", "user_id,session_id,score".to_string()),
                        ("session_id", eq(session)),
                        ("order", "score.desc".to_string()),
                        ("limit", limit.to_string()),
                    ],
                )
                .await?;
            Ok(rows.into_iter().map(LeaderboardEntry::from).collect())
        })
    }

    fn find_open_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionId>>> {
        let store = self.clone();
        Box::pin(async move {
            let rows = store
                .select::<SessionIdRow>(
                    SESSIONS_TABLE,
                    &[
                        ("select", "session_id".to_string()),
                        ("end_time", "is.null".to_string()),
                        ("order", "start_time.desc".to_string()),
                        ("limit", "1".to_string()),
                    ],
                )
                .await?;
            Ok(rows.into_iter().next().map(|row| row.session_id))
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            for table in [SESSIONS_TABLE, SCORES_TABLE] {
                let _: Vec<serde_json::Value> = store
                    .select(table, &[("select", "session_id".to_string()), ("limit", "1".to_string())])
                    .await?;
            }
            Ok(())
        })
    }
}
