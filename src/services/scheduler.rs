//! Queue of next-question requests submitted after a question is resolved.
//!
//! The answer path only enqueues; a single worker generates and posts, so a slow model call
//! never holds up the player's reply.

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
    services::quiz_service::{self, GenerationOutcome},
    state::SharedState,
    transport::MessageId,
};

/// Ask for the question following `resolved`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NextQuestionRequest {
    /// Correlates the request with the worker's log lines.
    pub id: Uuid,
    /// Message of the question that was just answered.
    pub resolved: MessageId,
}

/// Receiving half handed to [`run`].
pub type NextQuestionReceiver = mpsc::UnboundedReceiver<NextQuestionRequest>;

/// Serve requests until every sender is dropped.
pub async fn run(state: SharedState, mut requests: NextQuestionReceiver) {
    while let Some(request) = requests.recv().await {
        handle(&state, request).await;
    }
    info!("next-question queue closed; worker exiting");
}

/// Generate the follow-up question unless another one already went live.
pub async fn handle(state: &SharedState, request: NextQuestionRequest) -> GenerationOutcome {
    debug!(request_id = %request.id, resolved = %request.resolved, "serving next-question request");
    let outcome = quiz_service::generate_after(state, request.resolved).await;
    match &outcome {
        GenerationOutcome::Posted(message) => {
            info!(request_id = %request.id, %message, "next question posted");
        }
        GenerationOutcome::Superseded => {
            debug!(request_id = %request.id, "next-question request superseded; dropped");
        }
        failure => {
            warn!(request_id = %request.id, outcome = ?failure, "next question was not posted");
        }
    }
    outcome
}
