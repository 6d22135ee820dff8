use serde::Serialize;
use utoipa::ToSchema;

/// Payload returned by the `/healthcheck` route.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// "ok" while the score store is reachable, "degraded" otherwise.
    pub status: &'static str,
    /// Chat credentials verified and commands registered.
    pub ready: bool,
    /// Identifier of the active quiz session, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
}

impl HealthResponse {
    /// Build the response from the current flags.
    pub fn new(degraded: bool, ready: bool, session_id: Option<i64>) -> Self {
        Self {
            status: if degraded { "degraded" } else { "ok" },
            ready,
            session_id,
        }
    }
}
