/// The live question, its attempt book-keeping and scoring rules.
pub mod question;
/// Transition rules of the question slot.
pub mod slot_machine;

use std::sync::Arc;

use tokio::sync::{Mutex, MutexGuard, RwLock, mpsc, watch};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::AppConfig,
    dao::{models::SessionId, quiz_store::QuizStore},
    error::ServiceError,
    judge::QuizJudge,
    services::scheduler::{NextQuestionReceiver, NextQuestionRequest},
    transport::{ChannelInfo, ChatTransport, MessageId, UserId},
};

use self::question::QuestionSlot;

/// Handle shared by routes and background tasks.
pub type SharedState = Arc<AppState>;

/// Session pointer and question slot, always mutated together under one lock.
#[derive(Debug, Default)]
pub struct QuizState {
    /// Session new scores are recorded against.
    pub session: Option<SessionId>,
    /// Live question, if any.
    pub slot: QuestionSlot,
}

/// Central application state: adapters, quiz state and lifecycle flags.
pub struct AppState {
    config: Arc<AppConfig>,
    store: RwLock<Option<Arc<dyn QuizStore>>>,
    judge: Arc<dyn QuizJudge>,
    transport: Arc<dyn ChatTransport>,
    quiz: Mutex<QuizState>,
    quiz_channel: RwLock<Option<ChannelInfo>>,
    generation_gate: Mutex<()>,
    next_question: mpsc::UnboundedSender<NextQuestionRequest>,
    owner: RwLock<Option<UserId>>,
    degraded: watch::Sender<bool>,
    ready: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a store is installed and is not ready
    /// until the transport supervisor has verified the chat credentials. The returned
    /// receiver feeds the next-question worker.
    pub fn new(
        config: AppConfig,
        judge: Arc<dyn QuizJudge>,
        transport: Arc<dyn ChatTransport>,
    ) -> (SharedState, NextQuestionReceiver) {
        let (degraded_tx, _rx) = watch::channel(true);
        let (ready_tx, _rx) = watch::channel(false);
        let (next_tx, next_rx) = mpsc::unbounded_channel();

        let state = Arc::new(Self {
            config: Arc::new(config),
            store: RwLock::new(None),
            judge,
            transport,
            quiz: Mutex::new(QuizState::default()),
            quiz_channel: RwLock::new(None),
            generation_gate: Mutex::new(()),
            next_question: next_tx,
            owner: RwLock::new(None),
            degraded: degraded_tx,
            ready: ready_tx,
        });
        (state, next_rx)
    }

    /// Runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Answer judge.
    pub fn judge(&self) -> Arc<dyn QuizJudge> {
        self.judge.clone()
    }

    /// Chat transport.
    pub fn transport(&self) -> Arc<dyn ChatTransport> {
        self.transport.clone()
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn QuizStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Current store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_store(&self) -> Result<Arc<dyn QuizStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn QuizStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Flag the chat transport as usable; background loops waiting on it start servicing.
    pub fn mark_ready(&self) {
        self.ready.send_replace(true);
    }

    /// Subscribe to the readiness flag.
    pub fn ready_watcher(&self) -> watch::Receiver<bool> {
        self.ready.subscribe()
    }

    /// Application owner, once resolved.
    pub async fn owner(&self) -> Option<UserId> {
        *self.owner.read().await
    }

    /// Record the application owner.
    pub async fn set_owner(&self, owner: Option<UserId>) {
        *self.owner.write().await = owner;
    }

    /// Run `f` against the quiz state inside one critical section; never spans a network call.
    pub async fn with_quiz<R>(&self, f: impl FnOnce(&mut QuizState) -> R) -> R {
        let mut guard = self.quiz.lock().await;
        f(&mut guard)
    }

    /// Session currently accepting answers.
    pub async fn active_session(&self) -> Option<SessionId> {
        self.quiz.lock().await.session
    }

    /// Serializes question generation so two generators never interleave reset and post.
    pub async fn generation_gate(&self) -> MutexGuard<'_, ()> {
        self.generation_gate.lock().await
    }

    /// Resolve the quiz channel, caching the result until [`Self::forget_quiz_channel`].
    pub async fn quiz_channel(&self) -> Option<ChannelInfo> {
        if let Some(channel) = self.quiz_channel.read().await.clone() {
            return Some(channel);
        }

        let Some(id) = self.config.quiz_channel else {
            warn!("quiz channel is not configured");
            return None;
        };

        match self.transport.resolve_channel(id).await {
            Ok(channel) => {
                info!(channel_id = %channel.id, name = %channel.name, "quiz channel resolved");
                *self.quiz_channel.write().await = Some(channel.clone());
                Some(channel)
            }
            Err(err) => {
                error!(channel_id = %id, error = %err, "failed to resolve quiz channel");
                None
            }
        }
    }

    /// Drop the cached channel so the next access resolves it again.
    pub async fn forget_quiz_channel(&self) {
        self.quiz_channel.write().await.take();
    }

    /// Queue generation of the next question once `resolved` has been answered.
    pub fn request_next_question(&self, resolved: MessageId) -> Option<Uuid> {
        let request = NextQuestionRequest {
            id: Uuid::new_v4(),
            resolved,
        };
        let id = request.id;
        match self.next_question.send(request) {
            Ok(()) => Some(id),
            Err(_) => {
                error!(%resolved, "next-question worker is gone; request dropped");
                None
            }
        }
    }
}
