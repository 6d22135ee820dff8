//! Periodic inactivity check that retires questions nobody is answering.

use std::time::Duration;

use time::OffsetDateTime;
use tokio::{
    sync::watch,
    time::{MissedTickBehavior, interval},
};
use tracing::{debug, info};

use crate::{
    services::quiz_service::{self, GenerationOutcome},
    state::SharedState,
};

const MIN_PERIOD: Duration = Duration::from_secs(1);

/// What one watchdog pass did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchdogTick {
    /// Nothing stale.
    Idle,
    /// A stale question was skipped and a replacement requested.
    Rotated(GenerationOutcome),
}

/// Check the live question at `now`, rotating it when it went stale.
pub async fn tick(state: &SharedState, now: OffsetDateTime) -> WatchdogTick {
    match quiz_service::skip_if_stale(state, now).await {
        Some(_) => {
            let outcome = quiz_service::generate_and_post_question(state).await;
            info!(?outcome, "stale question rotated");
            WatchdogTick::Rotated(outcome)
        }
        None => WatchdogTick::Idle,
    }
}

/// Run [`tick`] every `watchdog_interval` until `shutdown` flips to `true`.
///
/// Nothing happens before the chat transport reports ready.
pub async fn run(state: SharedState, mut shutdown: watch::Receiver<bool>) {
    let mut ready = state.ready_watcher();
    tokio::select! {
        is_ready = async { ready.wait_for(|ready| *ready).await.is_ok() } => {
            if !is_ready {
                return;
            }
        }
        _ = async { shutdown.wait_for(|stop| *stop).await.is_ok() } => return,
    }

    let period = state.config().rules.watchdog_interval.max(MIN_PERIOD);
    info!(period_secs = period.as_secs(), "inactivity watchdog started");

    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let WatchdogTick::Idle = tick(&state, OffsetDateTime::now_utc()).await {
                    debug!("watchdog pass: nothing stale");
                }
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("inactivity watchdog stopped");
                    return;
                }
            }
        }
    }
}
