use std::sync::Arc;

use dashmap::DashMap;
use futures::future::BoxFuture;
use reqwest::{Client, Method, header::AUTHORIZATION};
use serde::{Serialize, de::DeserializeOwned};
use tracing::debug;

use crate::transport::{
    ChannelId, ChannelInfo, ChatTransport, CommandDefinition, MessageId, OutgoingMessage,
    TransportError, TransportResult, UserId, UserProfile,
};

use super::{
    config::DiscordConfig,
    models::{
        ApplicationInfo, CommandPayload, DiscordChannel, DiscordMessage, DiscordUser,
        MessagePayload,
    },
};

/// Discord REST client implementing [`ChatTransport`].
#[derive(Clone)]
pub struct DiscordTransport {
    client: Client,
    api_base: Arc<str>,
    authorization: Arc<str>,
    application_id: u64,
    profiles: Arc<DashMap<UserId, UserProfile>>,
}

impl DiscordTransport {
    /// Build the HTTP client; no request is issued until the first call.
    pub fn new(config: &DiscordConfig) -> TransportResult<Self> {
        let client = Client::builder()
            .build()
            .map_err(|source| TransportError::ClientBuilder { source })?;

        Ok(Self {
            client,
            api_base: Arc::from(config.api_base.trim_end_matches('/')),
            authorization: Arc::from(format!("Bot {}", config.bot_token)),
            application_id: config.application_id,
            profiles: Arc::new(DashMap::new()),
        })
    }

    async fn call<T, B>(&self, method: Method, path: &str, body: Option<&B>) -> TransportResult<T>
    where
        T: DeserializeOwned,
        B: ?Sized + Serialize,
    {
        let response = self.send(method, path, body, true).await?;
        response
            .json::<T>()
            .await
            .map_err(|source| TransportError::DecodeResponse {
                path: path.to_string(),
                source,
            })
    }

    async fn send<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        authorized: bool,
    ) -> TransportResult<reqwest::Response>
    where
        B: ?Sized + Serialize,
    {
        let url = format!("{}{}", self.api_base, path);
        let mut builder = self.client.request(method.clone(), url);
        if authorized {
            builder = builder.header(AUTHORIZATION, self.authorization.as_ref());
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|source| TransportError::RequestSend {
                path: path.to_string(),
                source,
            })?;

        let status = response.status();
        debug!(%method, path, %status, "discord request completed");
        if status.is_success() {
            Ok(response)
        } else {
            Err(TransportError::from_status(path, status))
        }
    }
}

impl ChatTransport for DiscordTransport {
    fn current_user(&self) -> BoxFuture<'static, TransportResult<UserProfile>> {
        let transport = self.clone();
        Box::pin(async move {
            let user: DiscordUser = transport
                .call(Method::GET, "/users/@me", None::<&()>)
                .await?;
            Ok(user.into())
        })
    }

    fn application_owner(&self) -> BoxFuture<'static, TransportResult<Option<UserId>>> {
        let transport = self.clone();
        Box::pin(async move {
            let info: ApplicationInfo = transport
                .call(Method::GET, "/oauth2/applications/@me", None::<&()>)
                .await?;
            Ok(info.owner_id())
        })
    }

    fn resolve_channel(&self, id: ChannelId) -> BoxFuture<'static, TransportResult<ChannelInfo>> {
        let transport = self.clone();
        Box::pin(async move {
            let channel: DiscordChannel = transport
                .call(Method::GET, &format!("/channels/{id}"), None::<&()>)
                .await?;
            Ok(ChannelInfo {
                id: channel.id,
                name: channel.name.unwrap_or_else(|| channel.id.to_string()),
            })
        })
    }

    fn send_message(
        &self,
        channel: ChannelId,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<MessageId>> {
        let transport = self.clone();
        Box::pin(async move {
            let payload = MessagePayload::from(message);
            let posted: DiscordMessage = transport
                .call(
                    Method::POST,
                    &format!("/channels/{channel}/messages"),
                    Some(&payload),
                )
                .await?;
            Ok(posted.id)
        })
    }

    fn edit_message(
        &self,
        channel: ChannelId,
        message_id: MessageId,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<()>> {
        let transport = self.clone();
        Box::pin(async move {
            let payload = MessagePayload::from(message);
            transport
                .send(
                    Method::PATCH,
                    &format!("/channels/{channel}/messages/{message_id}"),
                    Some(&payload),
                    true,
                )
                .await
                .map(|_| ())
        })
    }

    fn fetch_user(&self, id: UserId) -> BoxFuture<'static, TransportResult<UserProfile>> {
        let transport = self.clone();
        Box::pin(async move {
            if let Some(profile) = transport.profiles.get(&id) {
                return Ok(profile.clone());
            }
            let user: DiscordUser = transport
                .call(Method::GET, &format!("/users/{id}"), None::<&()>)
                .await?;
            let profile = UserProfile::from(user);
            transport.profiles.insert(id, profile.clone());
            Ok(profile)
        })
    }

    fn register_commands(
        &self,
        commands: Vec<CommandDefinition>,
    ) -> BoxFuture<'static, TransportResult<()>> {
        let transport = self.clone();
        Box::pin(async move {
            let payload: Vec<CommandPayload> =
                commands.into_iter().map(CommandPayload::from).collect();
            let path = format!("/applications/{}/commands", transport.application_id);
            transport
                .send(Method::PUT, &path, Some(&payload), true)
                .await
                .map(|_| ())
        })
    }

    fn complete_interaction(
        &self,
        token: String,
        message: OutgoingMessage,
    ) -> BoxFuture<'static, TransportResult<()>> {
        let transport = self.clone();
        Box::pin(async move {
            let payload = MessagePayload::from(message);
            let path = format!(
                "/webhooks/{}/{}/messages/@original",
                transport.application_id, token
            );
            // Interaction webhooks are authorised by the token in the path.
            transport
                .send(Method::PATCH, &path, Some(&payload), false)
                .await
                .map(|_| ())
        })
    }
}
