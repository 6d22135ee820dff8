use tracing::warn;

use crate::{dto::health::HealthResponse, state::SharedState};

/// Probe the score store and report degraded mode, readiness and the active session.
pub async fn health_status(state: &SharedState) -> HealthResponse {
    match state.store().await {
        Some(store) => {
            if let Err(err) = store.health_check().await {
                warn!(error = %err, "score store health check failed");
            }
        }
        None => warn!("score store unavailable (degraded mode)"),
    }

    let ready = *state.ready_watcher().borrow();
    let session = state.active_session().await;
    HealthResponse::new(state.is_degraded(), ready, session.map(|id| id.0))
}
