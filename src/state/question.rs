//! The single live quiz question and the rules that govern it.

use std::collections::HashMap;

use rand::Rng;
use time::{Duration, OffsetDateTime};

use crate::state::slot_machine::{InvalidTransition, SlotEvent, SlotMachine, SlotPhase};
use crate::transport::{MessageId, UserId};

/// Difficulty requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DifficultyTier {
    /// Entry level.
    Basic,
    /// Some familiarity needed.
    Intermediate,
    /// Expert level.
    Advanced,
}

impl DifficultyTier {
    /// Every tier, in ascending difficulty.
    pub const ALL: [DifficultyTier; 3] = [
        DifficultyTier::Basic,
        DifficultyTier::Intermediate,
        DifficultyTier::Advanced,
    ];

    /// Wording used when asking the model for a question.
    pub fn prompt_label(self) -> &'static str {
        match self {
            DifficultyTier::Basic => "basic knowledge",
            DifficultyTier::Intermediate => "intermediate knowledge",
            DifficultyTier::Advanced => "advanced knowledge",
        }
    }

    fn keyword(self) -> &'static str {
        match self {
            DifficultyTier::Basic => "basic",
            DifficultyTier::Intermediate => "intermediate",
            DifficultyTier::Advanced => "advanced",
        }
    }

    /// Case-insensitive substring match against the model's free-form assessment.
    pub fn from_assessment(assessment: &str) -> Option<Self> {
        let lower = assessment.to_lowercase();
        Self::ALL
            .into_iter()
            .find(|tier| lower.contains(tier.keyword()))
    }

    /// Uniform pick over [`Self::ALL`].
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }
}

/// Points awarded per difficulty tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PointTable {
    /// Basic questions.
    pub easy: i64,
    /// Intermediate questions and unknown assessments.
    pub medium: i64,
    /// Advanced questions.
    pub difficult: i64,
}

impl Default for PointTable {
    fn default() -> Self {
        Self {
            easy: 1,
            medium: 2,
            difficult: 5,
        }
    }
}

impl PointTable {
    /// Full value of a question; unknown assessments are worth the medium amount.
    pub fn points_for(&self, tier: Option<DifficultyTier>) -> i64 {
        match tier {
            Some(DifficultyTier::Basic) => self.easy,
            Some(DifficultyTier::Intermediate) | None => self.medium,
            Some(DifficultyTier::Advanced) => self.difficult,
        }
    }

    /// Half of `full`, rounded half up: 1 → 1, 2 → 1, 5 → 3.
    pub fn partial_points(full: i64) -> i64 {
        (full + 1).div_euclid(2)
    }
}

/// Player credited with the first correct or partially correct answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolver {
    /// Winning player.
    pub user: UserId,
    /// Name shown on the resolved card.
    pub display_name: String,
}

/// Question currently posted in the quiz channel.
#[derive(Debug, Clone)]
pub struct ActiveQuestion {
    /// Question text.
    pub text: String,
    /// Reference answer.
    pub intended_answer: String,
    /// Topic it was drawn from.
    pub topic: String,
    /// Difficulty as assessed by the model, used for display.
    pub difficulty_label: String,
    /// Full value of the question.
    pub points: i64,
    /// Handle of the posted message; identifies the question.
    pub message: MessageId,
    /// Last post or answer attempt.
    pub last_activity: OffsetDateTime,
    /// First player to answer correctly.
    pub resolver: Option<Resolver>,
    attempts: HashMap<UserId, u32>,
}

impl ActiveQuestion {
    /// Freshly posted question with no attempts.
    pub fn new(
        text: String,
        intended_answer: String,
        topic: String,
        difficulty_label: String,
        points: i64,
        message: MessageId,
        posted_at: OffsetDateTime,
    ) -> Self {
        Self {
            text,
            intended_answer,
            topic,
            difficulty_label,
            points,
            message,
            last_activity: posted_at,
            resolver: None,
            attempts: HashMap::new(),
        }
    }

    /// Answer attempts count as activity and push the inactivity deadline back.
    pub fn touch(&mut self, now: OffsetDateTime) {
        self.last_activity = now;
    }

    /// Attempts `user` spent on this question.
    pub fn attempts_used(&self, user: UserId) -> u32 {
        self.attempts.get(&user).copied().unwrap_or(0)
    }

    /// Charge one attempt unless `user` already spent `max`; returns the new count.
    pub fn try_charge_attempt(&mut self, user: UserId, max: u32) -> Option<u32> {
        let used = self.attempts.entry(user).or_insert(0);
        if *used >= max {
            return None;
        }
        *used += 1;
        Some(*used)
    }

    /// Give back an attempt charged for an evaluation that never completed.
    pub fn refund_attempt(&mut self, user: UserId) {
        if let Some(used) = self.attempts.get_mut(&user) {
            *used = used.saturating_sub(1);
        }
    }

    /// Attempts spent across all players.
    pub fn total_attempts(&self) -> u32 {
        self.attempts.values().sum()
    }

    /// Unresolved and idle for longer than `timeout`.
    pub fn is_stale(&self, now: OffsetDateTime, timeout: Duration) -> bool {
        self.resolver.is_none() && now - self.last_activity > timeout
    }
}

/// Why a resolver claim did not go through.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimRejected {
    /// The question was skipped or replaced while the answer was being judged.
    Closed,
    /// Someone else got there first.
    AlreadyClaimed(Resolver),
}

/// The question slot: lifecycle phase plus the live question, if any.
#[derive(Debug, Default)]
pub struct QuestionSlot {
    machine: SlotMachine,
    question: Option<ActiveQuestion>,
}

impl QuestionSlot {
    /// Lifecycle phase.
    pub fn phase(&self) -> SlotPhase {
        self.machine.phase()
    }

    /// Live question.
    pub fn current(&self) -> Option<&ActiveQuestion> {
        self.question.as_ref()
    }

    /// Live question, mutably.
    pub fn current_mut(&mut self) -> Option<&mut ActiveQuestion> {
        self.question.as_mut()
    }

    /// The live question, provided it is still the one posted as `message`.
    pub fn live_mut(&mut self, message: MessageId) -> Option<&mut ActiveQuestion> {
        self.question
            .as_mut()
            .filter(|question| question.message == message)
    }

    /// Clear the slot. Resetting an empty slot is a no-op.
    pub fn reset(&mut self) -> Option<ActiveQuestion> {
        // Reset is accepted from every phase.
        let _ = self.machine.apply(SlotEvent::Reset);
        self.question.take()
    }

    /// Install a freshly posted question; the slot must be empty.
    pub fn install(&mut self, question: ActiveQuestion) -> Result<(), InvalidTransition> {
        self.machine.apply(SlotEvent::Post)?;
        self.question = Some(question);
        Ok(())
    }

    /// Remove the live question so it can be revealed; `None` when nothing is posted.
    pub fn skip(&mut self) -> Option<ActiveQuestion> {
        self.machine.apply(SlotEvent::Skip).ok()?;
        self.question.take()
    }

    /// Skip the live question only if it went stale, in one step.
    pub fn skip_if_stale(
        &mut self,
        now: OffsetDateTime,
        timeout: Duration,
    ) -> Option<ActiveQuestion> {
        if self.question.as_ref()?.is_stale(now, timeout) {
            self.skip()
        } else {
            None
        }
    }

    /// Record `resolver` as the winner of the question posted as `message`.
    pub fn claim(
        &mut self,
        message: MessageId,
        resolver: Resolver,
    ) -> Result<&ActiveQuestion, ClaimRejected> {
        let Some(question) = self.question.as_mut().filter(|q| q.message == message) else {
            return Err(ClaimRejected::Closed);
        };
        if let Some(existing) = &question.resolver {
            return Err(ClaimRejected::AlreadyClaimed(existing.clone()));
        }
        self.machine
            .apply(SlotEvent::Resolve)
            .map_err(|_| ClaimRejected::Closed)?;
        question.resolver = Some(resolver);
        Ok(question)
    }
}
