//! Library crate for quiz-bot-back, exposing modules for the binary and tests.

/// Environment configuration.
pub mod config;
/// Persistence of sessions and scores.
pub mod dao;
/// HTTP payloads.
pub mod dto;
/// Service and HTTP error types.
pub mod error;
/// Language model question generation and answer judging.
pub mod judge;
/// Retry policies for external calls.
pub mod retry;
/// HTTP routes.
pub mod routes;
/// Quiz orchestration and background tasks.
pub mod services;
/// Shared application state.
pub mod state;
/// Chat platform adapter.
pub mod transport;

#[cfg(test)]
mod testing;
