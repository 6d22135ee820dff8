/// Slash-command table, authorization and dispatch.
pub mod commands;
/// OpenAPI documentation generation.
pub mod documentation;
/// Health check service.
pub mod health_service;
/// Translation of platform interactions into command invocations.
pub mod interaction_service;
/// Session leaderboard rendering.
pub mod leaderboard_service;
/// Channel-facing texts and embeds.
pub mod messages;
/// Sessions, question rotation, answer scoring and skips.
pub mod quiz_service;
/// Next-question queue and worker.
pub mod scheduler;
/// Score store setup, health probing and session restore.
pub mod storage_supervisor;
/// Chat credential check, command registration and readiness.
pub mod transport_supervisor;
/// Inactivity watchdog.
pub mod watchdog;
