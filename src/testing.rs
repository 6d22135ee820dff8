//! In-memory fakes for the store, judge and chat transport.

use std::{
    collections::{BTreeMap, HashMap, VecDeque},
    io,
    sync::{Arc, Mutex},
};

use futures::future::BoxFuture;
use time::OffsetDateTime;

use crate::{
    config::{AppConfig, TopicCatalog},
    dao::{
        models::{LeaderboardEntry, SessionDetails, SessionId},
        quiz_store::QuizStore,
        storage::{StorageError, StorageResult},
    },
    judge::{JudgeError, QuestionDraft, QuizJudge, Verdict, VerdictStatus},
    services::scheduler::NextQuestionReceiver,
    state::{AppState, SharedState, question::DifficultyTier},
    transport::{
        ChannelId, ChannelInfo, ChatTransport, CommandDefinition, MessageId, OutgoingMessage,
        TransportError, TransportResult, UserId, UserProfile,
    },
};

pub const QUIZ_CHANNEL: ChannelId = ChannelId(42);
pub const ADMIN: UserId = UserId(900);
pub const OWNER: UserId = UserId(901);

/// Configuration with every required variable set and a one-topic catalog.
pub fn test_config() -> AppConfig {
    let vars: HashMap<&str, &str> = [
        ("DISCORD_BOT_TOKEN", "token"),
        ("DISCORD_APPLICATION_ID", "1234"),
        ("DISCORD_PUBLIC_KEY", "00"),
        ("OPENAI_API_KEY", "sk-test"),
        ("SUPABASE_URL", "http://localhost:54321"),
        ("SUPABASE_KEY", "anon"),
        ("QUIZ_CHANNEL_ID", "42"),
        ("ADMIN_USER_IDS", "900"),
    ]
    .into_iter()
    .collect();
    let mut config = AppConfig::from_lookup(|key| vars.get(key).map(|value| value.to_string()))
        .expect("test configuration is valid");
    config.topics = TopicCatalog::Inline(vec!["Bitcoin basics".into()]);
    config
}

/// Question draft with a fixed text and the given difficulty assessment.
pub fn draft(assessment: &str) -> QuestionDraft {
    QuestionDraft {
        question: "What is the smallest unit of Bitcoin called?".into(),
        intended_answer: "satoshi".into(),
        difficulty_assessment: assessment.into(),
    }
}

/// Application state wired to fakes, plus handles to inspect them.
pub struct Harness {
    pub state: SharedState,
    pub next: NextQuestionReceiver,
    pub store: FakeStore,
    pub judge: FakeJudge,
    pub transport: FakeTransport,
}

impl Harness {
    /// State with a healthy store installed.
    pub async fn new() -> Self {
        Self::from_config(test_config()).await
    }

    pub async fn with_topics(topics: Vec<String>) -> Self {
        let mut config = test_config();
        config.topics = TopicCatalog::Inline(topics);
        Self::from_config(config).await
    }

    pub async fn from_config(config: AppConfig) -> Self {
        let harness = Self::build(config);
        harness
            .state
            .set_store(Arc::new(harness.store.clone()))
            .await;
        harness
    }

    /// State without a store, as during a storage outage.
    pub fn degraded() -> Self {
        Self::build(test_config())
    }

    fn build(config: AppConfig) -> Self {
        let store = FakeStore::default();
        let judge = FakeJudge::default();
        let transport = FakeTransport::default();
        let (state, next) =
            AppState::new(config, Arc::new(judge.clone()), Arc::new(transport.clone()));
        Self {
            state,
            next,
            store,
            judge,
            transport,
        }
    }
}

#[derive(Default)]
struct StoreData {
    sessions: BTreeMap<i64, SessionDetails>,
    scores: HashMap<(UserId, SessionId), i64>,
    calls: HashMap<&'static str, usize>,
    failures: VecDeque<bool>,
}

/// Store keeping sessions and scores in memory, with scriptable failures.
#[derive(Clone, Default)]
pub struct FakeStore {
    data: Arc<Mutex<StoreData>>,
}

impl FakeStore {
    /// Fail the next `count` calls, transiently or permanently.
    pub fn fail_next(&self, count: usize, transient: bool) {
        let mut data = self.data.lock().unwrap();
        data.failures.extend(std::iter::repeat_n(transient, count));
    }

    pub fn calls(&self, operation: &str) -> usize {
        self.data
            .lock()
            .unwrap()
            .calls
            .get(operation)
            .copied()
            .unwrap_or(0)
    }

    pub fn score(&self, user: UserId, session: SessionId) -> i64 {
        self.data
            .lock()
            .unwrap()
            .scores
            .get(&(user, session))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_ended(&self, session: SessionId) -> bool {
        self.data
            .lock()
            .unwrap()
            .sessions
            .get(&session.0)
            .is_some_and(|details| details.end_time.is_some())
    }

    /// Insert a session row directly, bypassing call accounting.
    pub fn seed_session(&self, open: bool) -> SessionId {
        let mut data = self.data.lock().unwrap();
        let id = SessionId(data.sessions.len() as i64 + 1);
        let now = OffsetDateTime::now_utc();
        data.sessions.insert(
            id.0,
            SessionDetails {
                id,
                start_time: now,
                end_time: (!open).then_some(now),
            },
        );
        id
    }

    fn with<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut StoreData) -> T,
    ) -> StorageResult<T> {
        let mut data = self.data.lock().unwrap();
        *data.calls.entry(operation).or_insert(0) += 1;
        match data.failures.pop_front() {
            Some(true) => Err(StorageError::transient(
                format!("{operation} timed out"),
                io::Error::new(io::ErrorKind::TimedOut, "timed out"),
            )),
            Some(false) => Err(StorageError::permanent(
                format!("{operation} rejected"),
                io::Error::new(io::ErrorKind::PermissionDenied, "rejected"),
            )),
            None => Ok(f(&mut data)),
        }
    }
}

impl QuizStore for FakeStore {
    fn create_session(&self) -> BoxFuture<'static, StorageResult<SessionId>> {
        let result = self.with("create_session", |data| {
            let id = SessionId(data.sessions.len() as i64 + 1);
            data.sessions.insert(
                id.0,
                SessionDetails {
                    id,
                    start_time: OffsetDateTime::now_utc(),
                    end_time: None,
                },
            );
            id
        });
        Box::pin(async move { result })
    }

    fn end_session(&self, id: SessionId) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.with("end_session", |data| {
            if let Some(details) = data.sessions.get_mut(&id.0) {
                details.end_time = Some(OffsetDateTime::now_utc());
            }
        });
        Box::pin(async move { result })
    }

    fn session_details(
        &self,
        id: SessionId,
    ) -> BoxFuture<'static, StorageResult<Option<SessionDetails>>> {
        let result = self.with("session_details", |data| data.sessions.get(&id.0).cloned());
        Box::pin(async move { result })
    }

    fn update_score(
        &self,
        user: UserId,
        session: SessionId,
        delta: i64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.with("update_score", |data| {
            *data.scores.entry((user, session)).or_insert(0) += delta;
        });
        Box::pin(async move { result })
    }

    fn leaderboard(
        &self,
        session: SessionId,
        limit: usize,
    ) -> BoxFuture<'static, StorageResult<Vec<LeaderboardEntry>>> {
        let result = self.with("leaderboard", |data| {
            let mut entries: Vec<_> = data
                .scores
                .iter()
                .filter(|((_, scored), _)| *scored == session)
                .map(|((user, _), score)| LeaderboardEntry {
                    user: *user,
                    score: *score,
                })
                .collect();
            entries.sort_by(|a, b| b.score.cmp(&a.score).then(a.user.cmp(&b.user)));
            entries.truncate(limit);
            entries
        });
        Box::pin(async move { result })
    }

    fn find_open_session(&self) -> BoxFuture<'static, StorageResult<Option<SessionId>>> {
        let result = self.with("find_open_session", |data| {
            data.sessions
                .values()
                .rev()
                .find(|details| details.end_time.is_none())
                .map(|details| details.id)
        });
        Box::pin(async move { result })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let result = self.with("health_check", |_| ());
        Box::pin(async move { result })
    }
}

#[derive(Default)]
struct JudgeScript {
    drafts: VecDeque<Result<QuestionDraft, JudgeError>>,
    verdicts: VecDeque<Result<Verdict, JudgeError>>,
    topics: Vec<String>,
    evaluations: usize,
}

/// Judge replaying scripted replies.
///
/// Without a script it hands out a basic question and rejects every answer. Evaluations yield
/// once before replying so concurrent answers interleave.
#[derive(Clone, Default)]
pub struct FakeJudge {
    script: Arc<Mutex<JudgeScript>>,
}

impl FakeJudge {
    pub fn push_draft(&self, draft: QuestionDraft) {
        self.script.lock().unwrap().drafts.push_back(Ok(draft));
    }

    pub fn fail_next_generation(&self) {
        self.script
            .lock()
            .unwrap()
            .drafts
            .push_back(Err(JudgeError::EmptyReply));
    }

    pub fn push_verdict(&self, status: VerdictStatus) {
        self.push_scripted_verdict(Verdict {
            status,
            explanation: None,
        });
    }

    pub fn push_scripted_verdict(&self, verdict: Verdict) {
        self.script.lock().unwrap().verdicts.push_back(Ok(verdict));
    }

    pub fn fail_next_evaluation(&self) {
        self.script
            .lock()
            .unwrap()
            .verdicts
            .push_back(Err(JudgeError::EmptyReply));
    }

    pub fn requested_topics(&self) -> Vec<String> {
        self.script.lock().unwrap().topics.clone()
    }

    pub fn evaluations(&self) -> usize {
        self.script.lock().unwrap().evaluations
    }
}

impl QuizJudge for FakeJudge {
    fn generate_question(
        &self,
        topic: String,
        _tier: DifficultyTier,
    ) -> BoxFuture<'static, Result<QuestionDraft, JudgeError>> {
        let result = {
            let mut script = self.script.lock().unwrap();
            script.topics.push(topic);
            script
                .drafts
                .pop_front()
                .unwrap_or_else(|| Ok(draft("basic knowledge")))
        };
        Box::pin(async move { result })
    }

    fn evaluate_answer(
        &self,
        _question: String,
        _intended_answer: String,
        _answer: String,
    ) -> BoxFuture<'static, Result<Verdict, JudgeError>> {
        let script = self.script.clone();
        Box::pin(async move {
            tokio::task::yield_now().await;
            let mut script = script.lock().unwrap();
            script.evaluations += 1;
            script.verdicts.pop_front().unwrap_or(Ok(Verdict {
                status: VerdictStatus::Incorrect,
                explanation: None,
            }))
        })
    }
}

#[derive(Default)]
struct TransportLog {
    sent: Vec<OutgoingMessage>,
    edits: Vec<(ChannelId, MessageId, OutgoingMessage)>,
    completions: Vec<(String, OutgoingMessage)>,
    registered: Vec<CommandDefinition>,
    fail_edits: bool,
    next_message: u64,
}

/// Chat transport recording everything it is asked to do.
#[derive(Clone, Default)]
pub struct FakeTransport {
    log: Arc<Mutex<TransportLog>>,
}

impl FakeTransport {
    pub fn sent(&self) -> Vec<OutgoingMessage> {
        self.log.lock().unwrap().sent.clone()
    }

    pub fn edits(&self) -> Vec<(ChannelId, MessageId, OutgoingMessage)> {
        self.log.lock().unwrap().edits.clone()
    }

    pub fn completions(&self) -> Vec<(String, OutgoingMessage)> {
        self.log.lock().unwrap().completions.clone()
    }

    pub fn registered(&self) -> Vec<CommandDefinition> {
        self.log.lock().unwrap().registered.clone()
    }

    /// Make every subsequent edit fail as if the message was deleted.
    pub fn fail_edits(&self) {
        self.log.lock().unwrap().fail_edits = true;
    }
}

impl ChatTransport for FakeTransport {
    fn current_user(&self) -> BoxFuture<'static, TransportResult<UserProfile>> {
        Box::pin(async {
            Ok(UserProfile {
                id: UserId(1),
                display_name: "quiz-bot".into(),
            })
        })
    }

    fn application_owner(&self) -> BoxFuture<'static, TransportResult<Option<UserId>>> {
        Box::pin(async { Ok(Some(OWNER)) })
    }

    fn resolve_channel(&self, id: ChannelId) -> BoxFuture<'static, TransportResult<ChannelInfo>> {
        Box::pin(async move {
            Ok(ChannelInfo {
                id,
                name: "quiz".into(),
            })
        })
    }

    fn send_message(
        &self,
        _channel: ChannelId,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<MessageId>> {
        let id = {
            let mut log = self.log.lock().unwrap();
            log.next_message += 1;
            log.sent.push(message);
            MessageId(100 + log.next_message)
        };
        Box::pin(async move { Ok(id) })
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<()>> {
        let result = {
            let mut log = self.log.lock().unwrap();
            if log.fail_edits {
                Err(TransportError::NotFound {
                    path: format!("/channels/{channel}/messages/{message_id}"),
                })
            } else {
                log.edits.push((channel, message_id, message));
                Ok(())
            }
        };
        Box::pin(async move { result })
    }

    fn fetch_user(&self, id: UserId) -> BoxFuture<'static, TransportResult<UserProfile>> {
        Box::pin(async move {
            Ok(UserProfile {
                id,
                display_name: format!("player-{id}"),
            })
        })
    }

    fn register_commands(
        &self,
        commands: Vec<CommandDefinition>,
    ) -> BoxFuture<'static, TransportResult<()>> {
        self.log.lock().unwrap().registered = commands;
        Box::pin(async { Ok(()) })
    }

    fn complete_interaction(
        &self,
        token: String,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<()>> {
        self.log.lock().unwrap().completions.push((token, message));
        Box::pin(async { Ok(()) })
    }
}
