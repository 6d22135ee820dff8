mod client;
mod config;
mod models;
mod signature;

pub use client::DiscordTransport;
pub use config::{DEFAULT_API_BASE, DiscordConfig};
pub use signature::{InteractionVerifier, SignatureError};
