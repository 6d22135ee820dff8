//! Chat-platform seam: identifiers, outgoing messages and the [`ChatTransport`] trait.

/// Discord REST client and interaction signature checks.
pub mod discord;
mod error;

use std::{fmt, str::FromStr};

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};

pub use error::{TransportError, TransportResult};

macro_rules! snowflake_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[serde_as]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(#[serde_as(as = "DisplayFromStr")] pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl FromStr for $name {
            type Err = std::num::ParseIntError;

            fn from_str(value: &str) -> Result<Self, Self::Err> {
                value.trim().parse().map(Self)
            }
        }
    };
}

snowflake_id!(
    /// Platform user identifier.
    UserId
);
snowflake_id!(
    /// Platform channel identifier.
    ChannelId
);
snowflake_id!(
    /// Handle of a posted message; doubles as the identity of a quiz question.
    MessageId
);

impl UserId {
    /// Inline mention markup for this user.
    pub fn mention(&self) -> String {
        format!("<@{}>", self.0)
    }
}

/// Minimal user profile used for display purposes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    /// Platform identifier.
    pub id: UserId,
    /// Nickname, global name or username, whichever is most specific.
    pub display_name: String,
}

impl UserProfile {
    /// Inline mention markup for this user.
    pub fn mention(&self) -> String {
        self.id.mention()
    }
}

/// Resolved channel handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelInfo {
    /// Platform identifier.
    pub id: ChannelId,
    /// Human readable channel name, when the platform reports one.
    pub name: String,
}

/// Rich card attached to a message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Embed {
    /// Bold heading.
    pub title: Option<String>,
    /// Main body text.
    pub description: Option<String>,
    /// Accent colour as `0xRRGGBB`.
    pub color: Option<u32>,
    /// Name/value pairs rendered under the description.
    pub fields: Vec<EmbedField>,
    /// Small print at the bottom of the card.
    pub footer: Option<String>,
}

/// One name/value entry of an [`Embed`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedField {
    /// Field label.
    pub name: String,
    /// Field value.
    pub value: String,
    /// Whether the field may share a row with its neighbours.
    pub inline: bool,
}

/// Message content to post or to replace an existing message with.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutgoingMessage {
    /// Plain text body.
    pub content: Option<String>,
    /// Optional rich card.
    pub embed: Option<Embed>,
}

impl OutgoingMessage {
    /// Plain text message.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            embed: None,
        }
    }

    /// Message made of a single embed.
    pub fn embed(embed: Embed) -> Self {
        Self {
            content: None,
            embed: Some(embed),
        }
    }

    /// Attach a text body next to the embed.
    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = Some(content.into());
        self
    }
}

/// Whether an interaction reply is visible to the whole channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyVisibility {
    /// Everyone in the channel sees the reply.
    Public,
    /// Only the invoking user sees the reply.
    Ephemeral,
}

/// Slash-command registration payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandDefinition {
    /// Command name as typed by users.
    pub name: &'static str,
    /// Short help text.
    pub description: &'static str,
    /// String options accepted by the command.
    pub options: Vec<CommandOptionDefinition>,
}

/// String option of a [`CommandDefinition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOptionDefinition {
    /// Option name.
    pub name: &'static str,
    /// Short help text.
    pub description: &'static str,
    /// Whether the option must be provided.
    pub required: bool,
}

/// Notification and command transport offered by the chat platform.
pub trait ChatTransport: Send + Sync {
    /// Identity of the bot account; succeeding proves the credentials work.
    fn current_user(&self) -> BoxFuture<'static, TransportResult<UserProfile>>;
    /// Owner of the bot application, if the platform exposes one.
    fn application_owner(&self) -> BoxFuture<'static, TransportResult<Option<UserId>>>;
    /// Look a channel up by identifier.
    fn resolve_channel(&self, id: ChannelId) -> BoxFuture<'static, TransportResult<ChannelInfo>>;
    /// Post a new message and return its handle.
    fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<MessageId>>;
    /// Replace the content of a previously posted message.
    fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<()>>;
    /// Fetch a user profile for display.
    fn fetch_user(&self, id: UserId) -> BoxFuture<'static, TransportResult<UserProfile>>;
    /// Replace the registered command set.
    fn register_commands(
        &self,
        commands: Vec<CommandDefinition>,
    ) -> BoxFuture<'static, TransportResult<()>>;
    /// Fill in the reply of a previously deferred interaction.
    fn complete_interaction(
        &self,
        token: String,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<()>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snowflakes_round_trip_as_strings() {
        let id: UserId = serde_json::from_str("\"80351110224678912\"").unwrap();
        assert_eq!(id, UserId(80351110224678912));
        assert_eq!(
            serde_json::to_string(&id).unwrap(),
            "\"80351110224678912\""
        );
    }

    #[test]
    fn mention_uses_platform_markup() {
        assert_eq!(UserId(42).mention(), "<@42>");
        assert_eq!("  7 ".parse::<ChannelId>().unwrap(), ChannelId(7));
    }
}
