use tracing::{debug, warn};

use crate::{
    error::ServiceError,
    services::messages::{self, LeaderboardLine},
    state::SharedState,
    transport::OutgoingMessage,
};

const NO_SESSION: &str = "No active quiz session. The leaderboard is empty or an admin needs to start a new session with `/start-session`.";

/// Top scores of the active session, best first, as a channel message.
pub async fn leaderboard(state: &SharedState) -> Result<OutgoingMessage, ServiceError> {
    let Some(session) = state.active_session().await else {
        return Ok(OutgoingMessage::text(NO_SESSION));
    };
    let store = state.require_store().await?;

    let entries = store
        .leaderboard(session, state.config().rules.leaderboard_limit)
        .await?;
    let start_time = match store.session_details(session).await {
        Ok(details) => details.map(|details| details.start_time),
        Err(err) => {
            warn!(%session, error = %err, "failed to read session details");
            None
        }
    };

    let transport = state.transport();
    let mut lines = Vec::with_capacity(entries.len());
    for entry in entries {
        let name = match transport.fetch_user(entry.user).await {
            Ok(profile) => profile.display_name,
            Err(err) => {
                debug!(user = %entry.user, error = %err, "could not resolve leaderboard name");
                format!("User ID: {}", entry.user)
            }
        };
        lines.push(LeaderboardLine {
            name,
            score: entry.score,
        });
    }

    Ok(OutgoingMessage::embed(messages::leaderboard_embed(
        session, start_time, &lines,
    )))
}
