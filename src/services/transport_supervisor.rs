use std::time::Duration;

use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::{services::commands, state::SharedState};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(60);

/// Verify the bot credentials, publish the command set and flag the transport as ready.
///
/// Credential checks are retried with doubling backoff; command registration and owner lookup
/// failures are logged and do not block readiness.
pub async fn run(state: SharedState) {
    let transport = state.transport();
    let mut delay = INITIAL_DELAY;

    let bot = loop {
        match transport.current_user().await {
            Ok(profile) => break profile,
            Err(err) => {
                warn!(error = %err, "chat credential check failed; retrying");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    };
    info!(bot_id = %bot.id, bot = %bot.display_name, "chat credentials verified");

    let definitions = commands::definitions();
    let count = definitions.len();
    match transport.register_commands(definitions).await {
        Ok(()) => info!(count, "slash commands registered"),
        Err(err) => error!(error = %err, "failed to register slash commands"),
    }

    match transport.application_owner().await {
        Ok(owner) => {
            if let Some(owner) = owner {
                info!(%owner, "application owner resolved");
            }
            state.set_owner(owner).await;
        }
        Err(err) => warn!(error = %err, "failed to resolve application owner"),
    }

    if state.config().admin_ids.is_empty() {
        warn!("no admin ids configured; privileged commands are limited to the application owner");
    }

    if state.quiz_channel().await.is_none() {
        warn!("quiz channel unavailable at startup; questions will not be posted until it resolves");
    }

    state.mark_ready();
    info!("chat transport ready");
}
