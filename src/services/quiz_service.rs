//! Quiz orchestration: sessions, question rotation, answer scoring and skips.
//!
//! Every read-then-write step on the question slot happens inside one
//! [`AppState::with_quiz`](crate::state::AppState::with_quiz) critical section; network calls
//! (judge, store, chat) always run with the lock released.

use std::{fmt, time::Duration};

use rand::seq::IndexedRandom;
use time::OffsetDateTime;
use tracing::{debug, error, info, warn};

use crate::{
    dao::{models::SessionId, quiz_store::QuizStore},
    error::ServiceError,
    judge::VerdictStatus,
    services::messages,
    state::{
        SharedState,
        question::{ActiveQuestion, ClaimRejected, DifficultyTier, PointTable, Resolver},
    },
    transport::{ChannelInfo, MessageId, OutgoingMessage, UserId, UserProfile},
};

/// What a generation attempt ended up doing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenerationOutcome {
    /// Question posted and installed in the slot.
    Posted(MessageId),
    /// The quiz channel could not be resolved.
    NoChannel,
    /// No session is active; the channel was told how to start one.
    NoSession,
    /// The topic catalog is empty or unreadable.
    NoTopics,
    /// The judge could not produce a question.
    JudgeFailed,
    /// The question could not be posted.
    PostFailed,
    /// A different question went live before this request was served.
    Superseded,
}

/// Open a new session, closing the previous one, and clear the question slot.
///
/// Returns the confirmation shown to the admin.
pub async fn start_session(state: &SharedState) -> Result<String, ServiceError> {
    let store = state.require_store().await?;

    if let Some(previous) = state.active_session().await
        && let Err(err) = store.end_session(previous).await
    {
        warn!(session = %previous, error = %err, "failed to close previous session");
    }

    let session = store.create_session().await?;
    let discarded = state
        .with_quiz(|quiz| {
            quiz.session = Some(session);
            quiz.slot.reset()
        })
        .await;
    if let Some(question) = discarded {
        debug!(message = %question.message, "discarded live question on session start");
    }
    info!(%session, "quiz session started");

    let start_time = match store.session_details(session).await {
        Ok(details) => details.map(|details| details.start_time),
        Err(err) => {
            warn!(%session, error = %err, "failed to read session details");
            None
        }
    };

    Ok(messages::session_started(session, start_time))
}

/// Replace the live question with a freshly generated one.
pub async fn generate_and_post_question(state: &SharedState) -> GenerationOutcome {
    let _gate = state.generation_gate().await;
    post_next_question(state).await
}

/// Generate the follow-up of the question posted as `resolved`.
///
/// Dropped as [`GenerationOutcome::Superseded`] when another question already replaced it.
pub async fn generate_after(state: &SharedState, resolved: MessageId) -> GenerationOutcome {
    let _gate = state.generation_gate().await;
    let superseded = state
        .with_quiz(|quiz| {
            quiz.slot
                .current()
                .is_some_and(|question| question.message != resolved)
        })
        .await;
    if superseded {
        return GenerationOutcome::Superseded;
    }
    post_next_question(state).await
}

async fn post_next_question(state: &SharedState) -> GenerationOutcome {
    let Some(channel) = state.quiz_channel().await else {
        error!("quiz channel unavailable; cannot post a question");
        return GenerationOutcome::NoChannel;
    };

    let session = state
        .with_quiz(|quiz| {
            let session = quiz.session?;
            quiz.slot.reset();
            Some(session)
        })
        .await;
    let Some(session) = session else {
        info!("no active session; asking an admin to start one");
        announce(state, &channel, messages::no_session_notice()).await;
        return GenerationOutcome::NoSession;
    };

    let catalog = &state.config().topics;
    let topics = catalog.load().await;
    let pick = {
        let mut rng = rand::rng();
        topics
            .choose(&mut rng)
            .cloned()
            .map(|topic| (topic, DifficultyTier::random(&mut rng)))
    };
    let Some((topic, tier)) = pick else {
        error!(source = %catalog.describe(), "no quiz topics available");
        announce(state, &channel, messages::no_topics_notice(&catalog.describe())).await;
        return GenerationOutcome::NoTopics;
    };

    debug!(%topic, ?tier, "requesting question");
    let draft = match state.judge().generate_question(topic.clone(), tier).await {
        Ok(draft) => draft,
        Err(err) => {
            error!(%topic, ?tier, error = %err, "question generation failed");
            announce(
                state,
                &channel,
                messages::generation_failed_notice(&err.to_string()),
            )
            .await;
            return GenerationOutcome::JudgeFailed;
        }
    };

    let assessed = DifficultyTier::from_assessment(&draft.difficulty_assessment);
    if assessed.is_none() {
        warn!(
            assessment = %draft.difficulty_assessment,
            "unrecognised difficulty assessment; awarding medium points"
        );
    }
    let points = state.config().rules.points.points_for(assessed);

    let card = messages::question_embed(
        &draft.question,
        &topic,
        &draft.difficulty_assessment,
        points,
        session,
    );
    let message = match state
        .transport()
        .send_message(channel.id, OutgoingMessage::embed(card))
        .await
    {
        Ok(message) => message,
        Err(err) => {
            if err.is_missing_target() {
                state.forget_quiz_channel().await;
            }
            error!(channel_id = %channel.id, error = %err, "failed to post question");
            return GenerationOutcome::PostFailed;
        }
    };

    let question = ActiveQuestion::new(
        draft.question,
        draft.intended_answer,
        topic,
        draft.difficulty_assessment,
        points,
        message,
        OffsetDateTime::now_utc(),
    );
    if let Err(err) = state.with_quiz(|quiz| quiz.slot.install(question)).await {
        error!(%message, error = %err, "posted question could not be installed");
        return GenerationOutcome::PostFailed;
    }

    info!(%session, %message, points, "question posted");
    GenerationOutcome::Posted(message)
}

/// Private reply to an `/answer` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerReply {
    /// No session or no live question.
    NothingActive,
    /// Someone already claimed the question.
    AlreadyAnswered {
        /// Player who got there first.
        resolver: Resolver,
    },
    /// The player used up their attempts.
    NoAttemptsLeft {
        /// Player who answered.
        player: UserId,
        /// Attempt budget per question.
        max_attempts: u32,
    },
    /// The score store is down.
    StoreUnavailable,
    /// The judge failed; the attempt was refunded.
    EvaluationFailed {
        /// Judge failure, as shown to the player.
        reason: String,
    },
    /// The question was skipped or replaced while the answer was judged.
    QuestionClosed,
    /// Full points awarded.
    Correct {
        /// Player who answered.
        player: UserId,
        /// Points awarded.
        points: i64,
        /// Whether the store accepted the score change.
        score_recorded: bool,
    },
    /// Half points awarded.
    PartiallyCorrect {
        /// Player who answered.
        player: UserId,
        /// Points awarded.
        points: i64,
        /// Judge's reasoning.
        explanation: Option<String>,
        /// Whether the store accepted the score change.
        score_recorded: bool,
    },
    /// Penalty deducted.
    Incorrect {
        /// Player who answered.
        player: UserId,
        /// Points deducted.
        penalty: i64,
        /// Attempts left on this question.
        remaining: u32,
        /// Whether the store accepted the score change.
        score_recorded: bool,
    },
}

impl AnswerReply {
    fn score_recorded(&self) -> bool {
        match self {
            AnswerReply::Correct { score_recorded, .. }
            | AnswerReply::PartiallyCorrect { score_recorded, .. }
            | AnswerReply::Incorrect { score_recorded, .. } => *score_recorded,
            _ => true,
        }
    }
}

impl fmt::Display for AnswerReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnswerReply::NothingActive => f.write_str(
                "There is no active quiz question or session right now. Please wait for an admin to start one.",
            ),
            AnswerReply::AlreadyAnswered { resolver } => write!(
                f,
                "This question was already answered by {}.",
                resolver.user.mention()
            ),
            AnswerReply::NoAttemptsLeft {
                player,
                max_attempts,
            } => write!(
                f,
                "Sorry {}, you have used all {max_attempts} attempts for this question.",
                player.mention()
            ),
            AnswerReply::StoreUnavailable => f.write_str(
                "Scores cannot be recorded right now. Please try again in a moment.",
            ),
            AnswerReply::EvaluationFailed { reason } => write!(
                f,
                "Sorry, I couldn't evaluate your answer right now: ({reason}). Your attempt was not counted. Please try again."
            ),
            AnswerReply::QuestionClosed => f.write_str(
                "That question is no longer active, so your answer was not scored.",
            ),
            AnswerReply::Correct { player, points, .. } => write!(
                f,
                "🎉 Correct, {}! You earned {points} points.",
                player.mention()
            ),
            AnswerReply::PartiallyCorrect {
                player,
                points,
                explanation,
                ..
            } => {
                write!(
                    f,
                    "👍 Partially Correct, {}! You earned {points} points.",
                    player.mention()
                )?;
                if let Some(explanation) = explanation {
                    write!(f, " {explanation}")?;
                }
                Ok(())
            }
            AnswerReply::Incorrect {
                player,
                penalty,
                remaining,
                ..
            } => write!(
                f,
                "❌ Incorrect, {}. You lose {penalty} points. You have {remaining} attempts remaining for this question.",
                player.mention()
            ),
        }?;

        if !self.score_recorded() {
            f.write_str("\n(Your score could not be saved right now.)")?;
        }
        Ok(())
    }
}

/// Question snapshot taken when an attempt is charged.
struct Ticket {
    session: SessionId,
    message: MessageId,
    text: String,
    intended_answer: String,
    points: i64,
}

/// Judge `answer` from `player` against the live question and settle the score.
pub async fn process_answer(
    state: &SharedState,
    player: &UserProfile,
    answer: &str,
) -> AnswerReply {
    let rules = &state.config().rules;
    let max_attempts = rules.max_attempts;

    let Some(store) = state.store().await else {
        warn!(user = %player.id, "answer received in degraded mode");
        return AnswerReply::StoreUnavailable;
    };

    let now = OffsetDateTime::now_utc();
    let admission = state
        .with_quiz(|quiz| -> Result<Ticket, AnswerReply> {
            let session = quiz.session.ok_or(AnswerReply::NothingActive)?;
            let question = quiz
                .slot
                .current_mut()
                .ok_or(AnswerReply::NothingActive)?;
            if let Some(resolver) = &question.resolver {
                return Err(AnswerReply::AlreadyAnswered {
                    resolver: resolver.clone(),
                });
            }
            question.touch(now);
            if question.try_charge_attempt(player.id, max_attempts).is_none() {
                return Err(AnswerReply::NoAttemptsLeft {
                    player: player.id,
                    max_attempts,
                });
            }
            Ok(Ticket {
                session,
                message: question.message,
                text: question.text.clone(),
                intended_answer: question.intended_answer.clone(),
                points: question.points,
            })
        })
        .await;
    let ticket = match admission {
        Ok(ticket) => ticket,
        Err(reply) => return reply,
    };

    let verdict = match state
        .judge()
        .evaluate_answer(
            ticket.text.clone(),
            ticket.intended_answer.clone(),
            answer.to_owned(),
        )
        .await
    {
        Ok(verdict) => verdict,
        Err(err) => {
            warn!(user = %player.id, message = %ticket.message, error = %err, "answer evaluation failed");
            state
                .with_quiz(|quiz| {
                    if let Some(question) = quiz.slot.live_mut(ticket.message) {
                        question.refund_attempt(player.id);
                    }
                })
                .await;
            return AnswerReply::EvaluationFailed {
                reason: err.to_string(),
            };
        }
    };

    debug!(user = %player.id, message = %ticket.message, status = ?verdict.status, "answer judged");

    let fully_correct = match verdict.status {
        VerdictStatus::Correct => true,
        VerdictStatus::PartiallyCorrect => false,
        VerdictStatus::Incorrect => {
            let penalty = rules.incorrect_penalty;
            let remaining = state
                .with_quiz(|quiz| -> Result<u32, AnswerReply> {
                    let question = quiz
                        .slot
                        .live_mut(ticket.message)
                        .ok_or(AnswerReply::QuestionClosed)?;
                    match &question.resolver {
                        Some(resolver) => Err(AnswerReply::AlreadyAnswered {
                            resolver: resolver.clone(),
                        }),
                        None => Ok(max_attempts.saturating_sub(question.attempts_used(player.id))),
                    }
                })
                .await;
            let remaining = match remaining {
                Ok(remaining) => remaining,
                Err(reply) => return reply,
            };
            let score_recorded = record_score(state, &*store, player.id, ticket.session, -penalty).await;
            return AnswerReply::Incorrect {
                player: player.id,
                penalty,
                remaining,
                score_recorded,
            };
        }
    };

    let points = if fully_correct {
        ticket.points
    } else {
        PointTable::partial_points(ticket.points)
    };
    let resolver = Resolver {
        user: player.id,
        display_name: player.display_name.clone(),
    };
    let claimed = state
        .with_quiz(|quiz| {
            quiz.slot
                .claim(ticket.message, resolver)
                .map(ActiveQuestion::clone)
        })
        .await;
    let question = match claimed {
        Ok(question) => question,
        Err(ClaimRejected::Closed) => return AnswerReply::QuestionClosed,
        Err(ClaimRejected::AlreadyClaimed(resolver)) => {
            return AnswerReply::AlreadyAnswered { resolver };
        }
    };
    info!(user = %player.id, message = %ticket.message, points, fully_correct, "question resolved");

    let score_recorded = record_score(state, &*store, player.id, ticket.session, points).await;
    announce_resolution(
        state,
        &question,
        ticket.session,
        player,
        points,
        verdict.explanation.as_deref(),
        fully_correct,
    )
    .await;
    state.request_next_question(ticket.message);

    if fully_correct {
        AnswerReply::Correct {
            player: player.id,
            points,
            score_recorded,
        }
    } else {
        AnswerReply::PartiallyCorrect {
            player: player.id,
            points,
            explanation: verdict.explanation,
            score_recorded,
        }
    }
}

async fn record_score(
    state: &SharedState,
    store: &dyn QuizStore,
    user: UserId,
    session: SessionId,
    delta: i64,
) -> bool {
    match store.update_score(user, session, delta).await {
        Ok(()) => true,
        Err(err) => {
            error!(%user, %session, delta, error = %err, degraded = state.is_degraded(), "failed to record score");
            false
        }
    }
}

async fn announce_resolution(
    state: &SharedState,
    question: &ActiveQuestion,
    session: SessionId,
    player: &UserProfile,
    points: i64,
    explanation: Option<&str>,
    fully_correct: bool,
) {
    let Some(channel) = state.quiz_channel().await else {
        warn!("quiz channel unavailable; resolution not announced");
        return;
    };

    let card = messages::resolved_embed(question, session, &player.display_name, fully_correct);
    if let Err(err) = state
        .transport()
        .edit_message(channel.id, question.message, OutgoingMessage::embed(card))
        .await
    {
        warn!(message = %question.message, error = %err, "failed to update answered question");
    }

    let mention = player.mention();
    let text = if fully_correct {
        messages::correct_announcement(&mention, points, &question.intended_answer)
    } else {
        messages::partial_announcement(&mention, points, explanation, &question.intended_answer)
    };
    announce(state, &channel, OutgoingMessage::text(text)).await;
}

/// Why a question is being abandoned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Admin command.
    Admin,
    /// Inactivity watchdog.
    Timeout,
    /// Anything else.
    Other,
}

impl SkipReason {
    fn describe(self, timeout: Duration) -> String {
        match self {
            SkipReason::Admin => "Skipped by an admin.".into(),
            SkipReason::Timeout => format!(
                "Question timed out after {} hours of inactivity. No one got it right.",
                format_hours(timeout)
            ),
            SkipReason::Other => "Question skipped.".into(),
        }
    }
}

fn format_hours(duration: Duration) -> String {
    let hours = duration.as_secs_f64() / 3600.0;
    if hours.fract() == 0.0 {
        format!("{hours:.0}")
    } else {
        format!("{hours:.1}")
    }
}

/// Result of a skip request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipOutcome {
    /// The question was removed; carries the reveal text.
    Skipped(String),
    /// No live question.
    NothingToSkip,
}

impl fmt::Display for SkipOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipOutcome::Skipped(reveal) => f.write_str(reveal),
            SkipOutcome::NothingToSkip => f.write_str("No active question to skip."),
        }
    }
}

/// Abandon the live question and reveal its answer. Does not post a replacement.
pub async fn skip_question(state: &SharedState, reason: SkipReason) -> SkipOutcome {
    let taken = state
        .with_quiz(|quiz| {
            let session = quiz.session?;
            quiz.slot.skip().map(|question| (session, question))
        })
        .await;
    match taken {
        Some((session, question)) => {
            SkipOutcome::Skipped(reveal_skipped(state, session, &question, reason).await)
        }
        None => SkipOutcome::NothingToSkip,
    }
}

/// Skip the live question if it has been idle past the inactivity timeout.
///
/// The staleness check and the removal happen in one critical section, so concurrent callers
/// skip a given question at most once.
pub async fn skip_if_stale(state: &SharedState, now: OffsetDateTime) -> Option<String> {
    let timeout = time::Duration::try_from(state.config().rules.inactivity_timeout)
        .unwrap_or(time::Duration::MAX);
    let (session, question) = state
        .with_quiz(|quiz| {
            let session = quiz.session?;
            quiz.slot
                .skip_if_stale(now, timeout)
                .map(|question| (session, question))
        })
        .await?;

    info!(message = %question.message, idle_since = %question.last_activity, "question timed out");
    Some(reveal_skipped(state, session, &question, SkipReason::Timeout).await)
}

async fn reveal_skipped(
    state: &SharedState,
    session: SessionId,
    question: &ActiveQuestion,
    reason: SkipReason,
) -> String {
    let reason = reason.describe(state.config().rules.inactivity_timeout);
    let reveal = messages::reveal(&question.text, &question.intended_answer);

    match state.quiz_channel().await {
        Some(channel) => {
            let edit = messages::skipped_message(question, session, &reason);
            if let Err(err) = state
                .transport()
                .edit_message(channel.id, question.message, edit)
                .await
            {
                warn!(message = %question.message, error = %err, "failed to mark question as skipped; posting instead");
                announce(
                    state,
                    &channel,
                    OutgoingMessage::text(format!("{reason}\n{reveal}")),
                )
                .await;
            }
        }
        None => warn!("quiz channel unavailable; skip not announced"),
    }

    info!(message = %question.message, %reason, "question skipped");
    format!("Question skipped. {reveal}")
}

/// Post to the quiz channel, dropping the cached channel when it disappeared.
async fn announce(state: &SharedState, channel: &ChannelInfo, message: OutgoingMessage) {
    if let Err(err) = state.transport().send_message(channel.id, message).await {
        if err.is_missing_target() {
            state.forget_quiz_channel().await;
        }
        warn!(channel_id = %channel.id, error = %err, "failed to post to quiz channel");
    }
}
