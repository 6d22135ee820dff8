use tracing::debug;

use crate::{
    dto::interaction::{
        INTERACTION_APPLICATION_COMMAND, INTERACTION_PING, InteractionRequest, InteractionResponse,
    },
    error::ServiceError,
    services::commands::{self, Acknowledgement, Invocation},
    state::SharedState,
    transport::{ReplyVisibility, UserProfile},
};

/// Answer a verified interaction: pings get a pong, commands are dispatched.
pub async fn handle(
    state: &SharedState,
    request: InteractionRequest,
) -> Result<InteractionResponse, ServiceError> {
    match request.kind {
        INTERACTION_PING => {
            debug!("interaction ping");
            Ok(InteractionResponse::pong())
        }
        INTERACTION_APPLICATION_COMMAND => {
            let invocation = into_invocation(request)?;
            let response = match commands::dispatch(state, invocation).await {
                Acknowledgement::Reply {
                    message,
                    visibility,
                } => InteractionResponse::message(
                    message.content.unwrap_or_default(),
                    visibility == ReplyVisibility::Ephemeral,
                ),
                Acknowledgement::Deferred { visibility } => {
                    InteractionResponse::deferred(visibility == ReplyVisibility::Ephemeral)
                }
            };
            Ok(response)
        }
        other => Err(ServiceError::InvalidInput(format!(
            "unsupported interaction type {other}"
        ))),
    }
}

fn into_invocation(request: InteractionRequest) -> Result<Invocation, ServiceError> {
    let data = request
        .data
        .ok_or_else(|| ServiceError::InvalidInput("command interaction without data".into()))?;

    let (user, nick) = match (request.member, request.user) {
        (Some(member), _) => (member.user, member.nick),
        (None, Some(user)) => (user, None),
        (None, None) => {
            return Err(ServiceError::InvalidInput(
                "command interaction without user".into(),
            ));
        }
    };
    let display_name = nick
        .or(user.global_name)
        .unwrap_or(user.username);

    Ok(Invocation {
        name: data.name,
        user: UserProfile {
            id: user.id,
            display_name,
        },
        options: data
            .options
            .iter()
            .map(|option| (option.name.clone(), option.as_text()))
            .collect(),
        token: request.token,
    })
}
