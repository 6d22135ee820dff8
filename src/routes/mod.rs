use std::sync::Arc;

use axum::Router;

use crate::{state::SharedState, transport::discord::InteractionVerifier};

/// Swagger UI.
pub mod docs;
/// Health check route.
pub mod health;
/// Discord interactions webhook.
pub mod interactions;

/// Compose all route trees, wiring in shared state and documentation routes.
pub fn router(state: SharedState, verifier: Arc<InteractionVerifier>) -> Router<()> {
    health::router()
        .merge(interactions::router(verifier))
        .merge(docs::router())
        .with_state(state)
}
