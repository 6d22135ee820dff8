use std::sync::Arc;

use axum::{
    Extension, Json, Router,
    body::Bytes,
    extract::State,
    http::HeaderMap,
    routing::post,
};
use tracing::warn;

use crate::{
    dto::interaction::{InteractionRequest, InteractionResponse},
    error::AppError,
    services::interaction_service,
    state::SharedState,
    transport::discord::InteractionVerifier,
};

const SIGNATURE_HEADER: &str = "x-signature-ed25519";
const TIMESTAMP_HEADER: &str = "x-signature-timestamp";

#[utoipa::path(
    post,
    path = "/interactions",
    tag = "interactions",
    request_body = InteractionRequest,
    params(
        ("X-Signature-Ed25519" = String, Header, description = "Hex ed25519 signature of timestamp + body"),
        ("X-Signature-Timestamp" = String, Header, description = "Timestamp covered by the signature"),
    ),
    responses(
        (status = 200, description = "Interaction acknowledged", body = InteractionResponse),
        (status = 400, description = "Malformed interaction"),
        (status = 401, description = "Missing or invalid signature"),
    )
)]
/// Verify the request signature, then answer or dispatch the interaction.
pub async fn interactions(
    State(state): State<SharedState>,
    Extension(verifier): Extension<Arc<InteractionVerifier>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<InteractionResponse>, AppError> {
    let signature = header(&headers, SIGNATURE_HEADER)?;
    let timestamp = header(&headers, TIMESTAMP_HEADER)?;
    if let Err(err) = verifier.verify(signature, timestamp, &body) {
        warn!(error = %err, "rejected interaction with bad signature");
        return Err(err.into());
    }

    let request: InteractionRequest = serde_json::from_slice(&body)?;
    let response = interaction_service::handle(&state, request).await?;
    Ok(Json(response))
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized(format!("missing `{name}` header")))
}

/// Configure the interactions webhook.
pub fn router(verifier: Arc<InteractionVerifier>) -> Router<SharedState> {
    Router::<SharedState>::new()
        .route("/interactions", post(interactions))
        .layer(Extension(verifier))
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use ed25519_dalek::{Signer, SigningKey};
    use serde_json::{Value, json};
    use tower::ServiceExt;

    use super::*;
    use crate::testing::Harness;

    fn keys() -> (SigningKey, Arc<InteractionVerifier>) {
        let signing = SigningKey::from_bytes(&[7u8; 32]);
        let verifier =
            InteractionVerifier::from_hex(&hex::encode(signing.verifying_key().to_bytes()))
                .unwrap();
        (signing, Arc::new(verifier))
    }

    fn signed(signing: &SigningKey, body: &str) -> Request<Body> {
        let timestamp = "1700000000";
        let signature = signing.sign(format!("{timestamp}{body}").as_bytes());
        Request::post("/interactions")
            .header(SIGNATURE_HEADER, hex::encode(signature.to_bytes()))
            .header(TIMESTAMP_HEADER, timestamp)
            .header("content-type", "application/json")
            .body(Body::from(body.to_owned()))
            .unwrap()
    }

    #[tokio::test]
    async fn signed_ping_gets_pong() {
        let harness = Harness::new().await;
        let (signing, verifier) = keys();
        let app = router(verifier).with_state(harness.state.clone());

        let response = app
            .oneshot(signed(&signing, r#"{"type":1}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "type": 1 }));
    }

    #[tokio::test]
    async fn tampered_body_is_rejected() {
        let harness = Harness::new().await;
        let (signing, verifier) = keys();
        let app = router(verifier).with_state(harness.state.clone());

        let mut request = signed(&signing, r#"{"type":1}"#);
        *request.body_mut() = Body::from(r#"{"type":2}"#);

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn unsigned_request_is_rejected() {
        let harness = Harness::new().await;
        let (_, verifier) = keys();
        let app = router(verifier).with_state(harness.state.clone());

        let request = Request::post("/interactions")
            .body(Body::from(r#"{"type":1}"#))
            .unwrap();

        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
