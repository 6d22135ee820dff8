//! Static slash-command table and dispatch.

use std::{collections::HashMap, sync::LazyLock};

use futures::future::BoxFuture;
use indexmap::IndexMap;
use tracing::{debug, error, info, warn};
use validator::Validate;

use crate::{
    error::ServiceError,
    services::{
        leaderboard_service,
        quiz_service::{self, SkipOutcome, SkipReason},
    },
    state::SharedState,
    transport::{
        CommandDefinition, CommandOptionDefinition, OutgoingMessage, ReplyVisibility, UserId,
        UserProfile,
    },
};

type Handler = for<'a> fn(&'a SharedState, &'a Invocation) -> BoxFuture<'a, OutgoingMessage>;

/// String option accepted by a command.
pub struct OptionSpec {
    /// Option name.
    pub name: &'static str,
    /// Help text.
    pub description: &'static str,
    /// Whether the option must be supplied.
    pub required: bool,
}

/// One entry of the command table.
pub struct CommandSpec {
    /// Help text.
    pub description: &'static str,
    /// Accepted options.
    pub options: &'static [OptionSpec],
    /// Restricted to admins and the application owner.
    pub privileged: bool,
    /// Who sees the reply.
    pub visibility: ReplyVisibility,
    handler: Handler,
}

static COMMANDS: LazyLock<IndexMap<&'static str, CommandSpec>> = LazyLock::new(|| {
    IndexMap::from([
        (
            "start-session",
            CommandSpec {
                description: "Start a new quiz session (admin only).",
                options: &[],
                privileged: true,
                visibility: ReplyVisibility::Public,
                handler: start_session,
            },
        ),
        (
            "skip-question",
            CommandSpec {
                description: "Skip the current question and post a new one (admin only).",
                options: &[],
                privileged: true,
                visibility: ReplyVisibility::Public,
                handler: skip_question,
            },
        ),
        (
            "answer",
            CommandSpec {
                description: "Answer the current quiz question.",
                options: &[OptionSpec {
                    name: ANSWER_OPTION,
                    description: "Your answer",
                    required: true,
                }],
                privileged: false,
                visibility: ReplyVisibility::Ephemeral,
                handler: answer,
            },
        ),
        (
            "leaderboard",
            CommandSpec {
                description: "Show the leaderboard for the current session.",
                options: &[],
                privileged: false,
                visibility: ReplyVisibility::Public,
                handler: leaderboard,
            },
        ),
    ])
});

const ANSWER_OPTION: &str = "answer";

/// A command invocation received from the chat platform.
#[derive(Debug, Clone)]
pub struct Invocation {
    /// Command name.
    pub name: String,
    /// Invoking player.
    pub user: UserProfile,
    /// Option values by name.
    pub options: HashMap<String, String>,
    /// Token used to complete a deferred reply.
    pub token: String,
}

impl Invocation {
    /// Value of option `name`, if supplied.
    pub fn option(&self, name: &str) -> Option<&str> {
        self.options.get(name).map(String::as_str)
    }
}

/// How the interaction is acknowledged right away.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Acknowledgement {
    /// Final reply, sent in the acknowledgement itself.
    Reply {
        /// Reply content.
        message: OutgoingMessage,
        /// Who sees the reply.
        visibility: ReplyVisibility,
    },
    /// "Thinking..." placeholder; the reply follows once the handler finishes.
    Deferred {
        /// Who sees the eventual reply.
        visibility: ReplyVisibility,
    },
}

/// Registration payload for every command, in table order.
pub fn definitions() -> Vec<CommandDefinition> {
    COMMANDS
        .iter()
        .map(|(&name, spec)| CommandDefinition {
            name,
            description: spec.description,
            options: spec
                .options
                .iter()
                .map(|option| CommandOptionDefinition {
                    name: option.name,
                    description: option.description,
                    required: option.required,
                })
                .collect(),
        })
        .collect()
}

/// Admins listed in the configuration and the application owner may run privileged commands.
pub fn authorize(
    admins: &[UserId],
    owner: Option<UserId>,
    user: UserId,
) -> Result<(), &'static str> {
    if admins.contains(&user) || owner == Some(user) {
        return Ok(());
    }
    if admins.is_empty() {
        Err("Admin IDs are not configured. This command is restricted.")
    } else {
        Err("You do not have permission to use this command.")
    }
}

/// Look the command up and check the caller may run it.
pub async fn admit(
    state: &SharedState,
    invocation: &Invocation,
) -> Result<&'static CommandSpec, OutgoingMessage> {
    let Some(spec) = COMMANDS.get(invocation.name.as_str()) else {
        warn!(command = %invocation.name, "unknown command");
        return Err(OutgoingMessage::text("Unknown command."));
    };

    if spec.privileged {
        let owner = state.owner().await;
        if let Err(reason) = authorize(&state.config().admin_ids, owner, invocation.user.id) {
            warn!(command = %invocation.name, user = %invocation.user.id, "privileged command denied");
            return Err(OutgoingMessage::text(reason));
        }
    }
    Ok(spec)
}

/// Acknowledge `invocation` and run its handler in the background.
pub async fn dispatch(state: &SharedState, invocation: Invocation) -> Acknowledgement {
    let spec = match admit(state, &invocation).await {
        Ok(spec) => spec,
        Err(message) => {
            return Acknowledgement::Reply {
                message,
                visibility: ReplyVisibility::Ephemeral,
            };
        }
    };

    info!(command = %invocation.name, user = %invocation.user.id, "running command");
    let state = state.clone();
    let handler = spec.handler;
    tokio::spawn(async move {
        let reply = handler(&state, &invocation).await;
        if let Err(err) = state
            .transport()
            .complete_interaction(invocation.token.clone(), reply)
            .await
        {
            error!(command = %invocation.name, error = %err, "failed to deliver command reply");
        }
    });

    Acknowledgement::Deferred {
        visibility: spec.visibility,
    }
}

fn start_session<'a>(state: &'a SharedState, _: &'a Invocation) -> BoxFuture<'a, OutgoingMessage> {
    Box::pin(async move {
        match quiz_service::start_session(state).await {
            Ok(confirmation) => {
                let outcome = quiz_service::generate_and_post_question(state).await;
                debug!(?outcome, "first question of the session");
                OutgoingMessage::text(format!("Scores have been reset! {confirmation}"))
            }
            Err(ServiceError::Degraded) => OutgoingMessage::text(
                "The score store is unavailable right now, so no session can be started. Please try again shortly.",
            ),
            Err(err) => {
                error!(error = %err, "failed to start session");
                OutgoingMessage::text(format!("Failed to start a new session: {err}"))
            }
        }
    })
}

fn skip_question<'a>(state: &'a SharedState, _: &'a Invocation) -> BoxFuture<'a, OutgoingMessage> {
    Box::pin(async move {
        let skipped = quiz_service::skip_question(state, SkipReason::Admin).await;
        let outcome = quiz_service::generate_and_post_question(state).await;
        debug!(?outcome, "replacement question after admin skip");
        match skipped {
            SkipOutcome::Skipped(reveal) => {
                OutgoingMessage::text(format!("Question skipped by admin. {reveal}"))
            }
            SkipOutcome::NothingToSkip => OutgoingMessage::text(skipped.to_string()),
        }
    })
}

#[derive(Debug, Validate)]
struct AnswerInput {
    #[validate(length(min = 1, max = 500))]
    text: String,
}

fn answer<'a>(state: &'a SharedState, invocation: &'a Invocation) -> BoxFuture<'a, OutgoingMessage> {
    Box::pin(async move {
        let input = AnswerInput {
            text: invocation
                .option(ANSWER_OPTION)
                .unwrap_or_default()
                .trim()
                .to_owned(),
        };
        if let Err(err) = input.validate() {
            debug!(user = %invocation.user.id, error = %err, "answer rejected");
            return OutgoingMessage::text("Please provide an answer between 1 and 500 characters.");
        }

        let reply = quiz_service::process_answer(state, &invocation.user, &input.text).await;
        OutgoingMessage::text(reply.to_string())
    })
}

fn leaderboard<'a>(state: &'a SharedState, _: &'a Invocation) -> BoxFuture<'a, OutgoingMessage> {
    Box::pin(async move {
        match leaderboard_service::leaderboard(state).await {
            Ok(message) => message,
            Err(err) => {
                error!(error = %err, "failed to build leaderboard");
                OutgoingMessage::text(
                    "Could not fetch the leaderboard right now. Please try again later.",
                )
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::testing::{ADMIN, Harness, OWNER};

    fn invocation(name: &str, user: UserId, options: &[(&str, &str)]) -> Invocation {
        Invocation {
            name: name.into(),
            user: UserProfile {
                id: user,
                display_name: format!("player-{user}"),
            },
            options: options
                .iter()
                .map(|(key, value)| (key.to_string(), value.to_string()))
                .collect(),
            token: "interaction-token".into(),
        }
    }

    async fn run(harness: &Harness, invocation: &Invocation) -> OutgoingMessage {
        let spec = admit(&harness.state, invocation).await.unwrap();
        (spec.handler)(&harness.state, invocation).await
    }

    #[test]
    fn authorization_rules() {
        let admins = [UserId(1)];
        assert!(authorize(&admins, None, UserId(1)).is_ok());
        assert!(authorize(&admins, Some(UserId(2)), UserId(2)).is_ok());
        assert_eq!(
            authorize(&admins, Some(UserId(2)), UserId(3)),
            Err("You do not have permission to use this command.")
        );
        assert_eq!(
            authorize(&[], Some(UserId(2)), UserId(3)),
            Err("Admin IDs are not configured. This command is restricted.")
        );
        assert!(authorize(&[], Some(UserId(2)), UserId(2)).is_ok());
    }

    #[test]
    fn answer_declares_its_required_option() {
        let answer = definitions()
            .into_iter()
            .find(|definition| definition.name == "answer")
            .unwrap();
        assert_eq!(answer.options.len(), 1);
        assert!(answer.options[0].required);
    }

    #[tokio::test]
    async fn players_cannot_start_sessions() {
        let harness = Harness::new().await;
        let denied = admit(&harness.state, &invocation("start-session", UserId(5), &[])).await;
        assert_eq!(
            denied.err(),
            Some(OutgoingMessage::text(
                "You do not have permission to use this command."
            ))
        );
    }

    #[tokio::test]
    async fn owner_is_admitted_without_being_listed() {
        let harness = Harness::new().await;
        harness.state.set_owner(Some(OWNER)).await;
        assert!(
            admit(&harness.state, &invocation("skip-question", OWNER, &[]))
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn unknown_command_is_answered_immediately() {
        let harness = Harness::new().await;
        let ack = dispatch(&harness.state, invocation("dance", UserId(5), &[])).await;
        assert_eq!(
            ack,
            Acknowledgement::Reply {
                message: OutgoingMessage::text("Unknown command."),
                visibility: ReplyVisibility::Ephemeral,
            }
        );
    }

    #[tokio::test]
    async fn start_session_posts_first_question() {
        let harness = Harness::new().await;

        let reply = run(&harness, &invocation("start-session", ADMIN, &[])).await;

        assert!(reply.content.unwrap().starts_with("Scores have been reset! New quiz session #1"));
        let card = harness.transport.sent().pop().unwrap();
        assert!(card.embed.is_some());
    }

    #[tokio::test]
    async fn blank_answer_is_rejected() {
        let harness = Harness::new().await;
        let reply = run(&harness, &invocation("answer", UserId(5), &[("answer", "   ")])).await;
        assert_eq!(
            reply.content.as_deref(),
            Some("Please provide an answer between 1 and 500 characters.")
        );
        assert_eq!(harness.judge.evaluations(), 0);
    }

    #[tokio::test]
    async fn deferred_reply_is_completed_in_background() {
        let harness = Harness::new().await;

        let ack = dispatch(
            &harness.state,
            invocation("answer", UserId(5), &[("answer", "satoshi")]),
        )
        .await;
        assert_eq!(
            ack,
            Acknowledgement::Deferred {
                visibility: ReplyVisibility::Ephemeral
            }
        );

        let completions = tokio::time::timeout(Duration::from_secs(1), async {
            loop {
                let completions = harness.transport.completions();
                if !completions.is_empty() {
                    break completions;
                }
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
        assert_eq!(completions[0].0, "interaction-token");
        assert_eq!(
            completions[0].1.content.as_deref(),
            Some(
                "There is no active quiz question or session right now. Please wait for an admin to start one."
            )
        );
    }
}
