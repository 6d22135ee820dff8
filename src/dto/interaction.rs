use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::transport::UserId;

/// Health probe sent by the platform when the endpoint is registered.
pub const INTERACTION_PING: u8 = 1;
/// Slash-command invocation.
pub const INTERACTION_APPLICATION_COMMAND: u8 = 2;

const RESPONSE_PONG: u8 = 1;
const RESPONSE_CHANNEL_MESSAGE: u8 = 4;
const RESPONSE_DEFERRED_CHANNEL_MESSAGE: u8 = 5;
const FLAG_EPHEMERAL: u64 = 1 << 6;

/// Interaction payload posted by Discord to `/interactions`.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InteractionRequest {
    /// Interaction type (1 = ping, 2 = application command).
    #[serde(rename = "type")]
    pub kind: u8,
    /// Continuation token used to complete deferred replies.
    #[serde(default)]
    pub token: String,
    /// Command payload; absent on pings.
    pub data: Option<CommandData>,
    /// Invoking member when the command ran in a guild.
    pub member: Option<GuildMember>,
    /// Invoking user when the command ran in a direct message.
    pub user: Option<InteractionUser>,
}

/// Invoked command and its options.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommandData {
    /// Registered command name.
    pub name: String,
    /// Supplied options, in the order given.
    #[serde(default)]
    pub options: Vec<CommandOptionValue>,
}

/// One option value supplied by the user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CommandOptionValue {
    /// Option name.
    pub name: String,
    /// Raw option value.
    #[schema(value_type = Object)]
    pub value: serde_json::Value,
}

impl CommandOptionValue {
    /// Value as text; non-string values keep their JSON rendering.
    pub fn as_text(&self) -> String {
        match &self.value {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}

/// Guild member wrapper around the invoking user.
#[derive(Debug, Deserialize, ToSchema)]
pub struct GuildMember {
    /// Underlying account.
    pub user: InteractionUser,
    /// Guild-specific nickname.
    pub nick: Option<String>,
}

/// Account that invoked the command.
#[derive(Debug, Deserialize, ToSchema)]
pub struct InteractionUser {
    /// Account identifier.
    #[schema(value_type = String)]
    pub id: UserId,
    /// Unique account name.
    pub username: String,
    /// Display name chosen by the user.
    pub global_name: Option<String>,
}

/// Synchronous answer to an interaction.
#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct InteractionResponse {
    /// Response type (1 = pong, 4 = message, 5 = deferred message).
    #[serde(rename = "type")]
    pub kind: u8,
    /// Message body; absent for pongs.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<InteractionResponseData>,
}

/// Body of a message response.
#[derive(Debug, PartialEq, Eq, Serialize, ToSchema)]
pub struct InteractionResponseData {
    /// Message text.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    /// Message flags, e.g. ephemeral.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flags: Option<u64>,
}

impl InteractionResponse {
    /// Acknowledge a ping.
    pub fn pong() -> Self {
        Self {
            kind: RESPONSE_PONG,
            data: None,
        }
    }

    /// Immediate reply, private when `ephemeral`.
    pub fn message(content: String, ephemeral: bool) -> Self {
        Self {
            kind: RESPONSE_CHANNEL_MESSAGE,
            data: Some(InteractionResponseData {
                content: Some(content),
                flags: ephemeral.then_some(FLAG_EPHEMERAL),
            }),
        }
    }

    /// Defer the reply; the content follows through the interaction token.
    pub fn deferred(ephemeral: bool) -> Self {
        Self {
            kind: RESPONSE_DEFERRED_CHANNEL_MESSAGE,
            data: ephemeral.then_some(InteractionResponseData {
                content: None,
                flags: Some(FLAG_EPHEMERAL),
            }),
        }
    }
}
