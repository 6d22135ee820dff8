use serde::{Deserialize, Serialize};

use crate::transport::{
    ChannelId, CommandDefinition, Embed, MessageId, OutgoingMessage, UserId, UserProfile,
};

const CHAT_INPUT_COMMAND: u8 = 1;
const STRING_OPTION: u8 = 3;

#[derive(Debug, Deserialize)]
pub struct DiscordUser {
    pub id: UserId,
    pub username: String,
    #[serde(default)]
    pub global_name: Option<String>,
}

impl From<DiscordUser> for UserProfile {
    fn from(user: DiscordUser) -> Self {
        Self {
            id: user.id,
            display_name: user.global_name.unwrap_or(user.username),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DiscordChannel {
    pub id: ChannelId,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DiscordMessage {
    pub id: MessageId,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationInfo {
    #[serde(default)]
    pub owner: Option<DiscordUser>,
    #[serde(default)]
    pub team: Option<ApplicationTeam>,
}

#[derive(Debug, Deserialize)]
pub struct ApplicationTeam {
    pub owner_user_id: UserId,
}

impl ApplicationInfo {
    /// Team-owned applications report the team owner instead of a user owner.
    pub fn owner_id(&self) -> Option<UserId> {
        self.team
            .as_ref()
            .map(|team| team.owner_user_id)
            .or_else(|| self.owner.as_ref().map(|owner| owner.id))
    }
}

#[derive(Debug, Serialize)]
pub struct MessagePayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub embeds: Vec<EmbedPayload>,
}

impl From<OutgoingMessage> for MessagePayload {
    fn from(message: OutgoingMessage) -> Self {
        Self {
            content: message.content,
            embeds: message.embed.map(EmbedPayload::from).into_iter().collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct EmbedPayload {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<u32>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<EmbedFieldPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer: Option<EmbedFooterPayload>,
}

#[derive(Debug, Serialize)]
pub struct EmbedFieldPayload {
    pub name: String,
    pub value: String,
    pub inline: bool,
}

#[derive(Debug, Serialize)]
pub struct EmbedFooterPayload {
    pub text: String,
}

impl From<Embed> for EmbedPayload {
    fn from(embed: Embed) -> Self {
        Self {
            title: embed.title,
            description: embed.description,
            color: embed.color,
            fields: embed
                .fields
                .into_iter()
                .map(|field| EmbedFieldPayload {
                    name: field.name,
                    value: field.value,
                    inline: field.inline,
                })
                .collect(),
            footer: embed.footer.map(|text| EmbedFooterPayload { text }),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct CommandPayload {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "type")]
    pub kind: u8,
    pub options: Vec<CommandOptionPayload>,
}

#[derive(Debug, Serialize)]
pub struct CommandOptionPayload {
    #[serde(rename = "type")]
    pub kind: u8,
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

impl From<CommandDefinition> for CommandPayload {
    fn from(command: CommandDefinition) -> Self {
        Self {
            name: command.name,
            description: command.description,
            kind: CHAT_INPUT_COMMAND,
            options: command
                .options
                .into_iter()
                .map(|option| CommandOptionPayload {
                    kind: STRING_OPTION,
                    name: option.name,
                    description: option.description,
                    required: option.required,
                })
                .collect(),
        }
    }
}
