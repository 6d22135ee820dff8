use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the quiz bot.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::interactions::interactions,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::interaction::InteractionRequest,
            crate::dto::interaction::InteractionResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "interactions", description = "Slash-command webhook called by Discord"),
    )
)]
/// OpenAPI description of the HTTP surface.
pub struct ApiDoc;
