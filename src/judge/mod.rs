//! Language-model seam: question generation and answer judgement.

mod openai;
mod prompts;
mod reply;

use std::time::Duration;

use futures::future::BoxFuture;
use reqwest::StatusCode;
use thiserror::Error;

use crate::retry::Retryable;
use crate::state::question::DifficultyTier;

pub use openai::{OpenAiConfig, OpenAiJudge};

/// Question produced by the model, validated at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionDraft {
    /// Question text shown to players.
    pub question: String,
    /// Reference answer the judge compares against.
    pub intended_answer: String,
    /// Free-form difficulty label chosen by the model; points are derived from it.
    pub difficulty_assessment: String,
}

/// Outcome category of one answer evaluation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerdictStatus {
    /// Fully correct.
    Correct,
    /// Close enough for partial credit.
    PartiallyCorrect,
    /// Wrong, or an unrecognised status.
    Incorrect,
}

/// Judgement of one submitted answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    /// Verdict category.
    pub status: VerdictStatus,
    /// Short reasoning; mostly meaningful for partial answers.
    pub explanation: Option<String>,
}

/// Failures raised by judge implementations.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// HTTP client could not be built.
    #[error("failed to build language model client")]
    ClientBuilder {
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// Connection failure or timeout.
    #[error("language model request failed")]
    Request {
        /// Underlying HTTP client error.
        #[source]
        source: reqwest::Error,
    },
    /// HTTP 429; may carry the server-suggested delay.
    #[error("language model rate limit hit")]
    RateLimited {
        /// Delay from the `Retry-After` header.
        retry_after: Option<Duration>,
    },
    /// Other non-success status.
    #[error("language model returned status {status}: {message}")]
    Status {
        /// Status returned.
        status: StatusCode,
        /// Response body, as far as it could be read.
        message: String,
    },
    /// Completion carried no message content.
    #[error("language model returned no content")]
    EmptyReply,
    /// Content is not the expected JSON shape.
    #[error("language model reply is malformed: {reason}")]
    MalformedReply {
        /// What was wrong with the content.
        reason: String,
        /// Content as returned by the model.
        raw: String,
    },
}

impl Retryable for JudgeError {
    fn is_retryable(&self) -> bool {
        match self {
            JudgeError::Request { .. } | JudgeError::RateLimited { .. } => true,
            JudgeError::Status { status, .. } => status.is_server_error(),
            JudgeError::ClientBuilder { .. }
            | JudgeError::EmptyReply
            | JudgeError::MalformedReply { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            JudgeError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Prompt-in, structured-judgement-out contract used by the quiz orchestrator.
pub trait QuizJudge: Send + Sync {
    /// Ask for a new question on `topic` at roughly the requested difficulty.
    fn generate_question(
        &self,
        topic: String,
        tier: DifficultyTier,
    ) -> BoxFuture<'static, Result<QuestionDraft, JudgeError>>;

    /// Judge `answer` against the question and its intended answer.
    fn evaluate_answer(
        &self,
        question: String,
        intended_answer: String,
        answer: String,
    ) -> BoxFuture<'static, Result<Verdict, JudgeError>>;
}
