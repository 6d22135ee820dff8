/// Health check payloads.
pub mod health;
/// Interaction webhook payloads.
pub mod interaction;
