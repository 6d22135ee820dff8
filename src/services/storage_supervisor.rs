use std::{future::Future, sync::Arc, time::Duration};

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::{
    dao::{quiz_store::QuizStore, storage::StorageError},
    services::quiz_service,
    state::SharedState,
};

const INITIAL_DELAY: Duration = Duration::from_millis(1_000);
const MAX_DELAY: Duration = Duration::from_secs(30);
const HEALTH_POLL_INTERVAL: Duration = Duration::from_secs(30);

/// Build the score store, install it, then keep probing it and toggle degraded mode on failures.
pub async fn run<F, Fut>(state: SharedState, mut connect: F)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = Result<Arc<dyn QuizStore>, StorageError>> + Send,
{
    let mut delay = INITIAL_DELAY;

    let store = loop {
        match connect().await {
            Ok(store) => break store,
            Err(err) => {
                warn!(error = %err, "score store setup failed");
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    };

    state.set_store(store.clone()).await;
    info!("score store installed; leaving degraded mode");
    restore_open_session(&state, store.as_ref()).await;

    delay = INITIAL_DELAY;
    loop {
        match store.health_check().await {
            Ok(()) => {
                if state.is_degraded() {
                    info!("score store healthy again; leaving degraded mode");
                    state.update_degraded(false);
                }
                delay = INITIAL_DELAY;
                sleep(HEALTH_POLL_INTERVAL).await;
            }
            Err(err) => {
                if !state.is_degraded() {
                    warn!(error = %err, "score store health check failed; entering degraded mode");
                    state.update_degraded(true);
                } else {
                    debug!(error = %err, "score store still unhealthy");
                }
                sleep(delay).await;
                delay = (delay * 2).min(MAX_DELAY);
            }
        }
    }
}

/// Resume the most recent open session when none is active yet, then post a question for it
/// once the chat transport is ready.
pub async fn restore_open_session(state: &SharedState, store: &dyn QuizStore) -> bool {
    if !state.config().restore_open_session {
        return false;
    }

    let open = match store.find_open_session().await {
        Ok(Some(session)) => session,
        Ok(None) => {
            debug!("no open session to restore");
            return false;
        }
        Err(err) => {
            warn!(error = %err, "failed to look up open session");
            return false;
        }
    };

    let restored = state
        .with_quiz(|quiz| {
            if quiz.session.is_some() {
                return false;
            }
            quiz.session = Some(open);
            true
        })
        .await;
    if !restored {
        return false;
    }

    info!(session = %open, "restored open quiz session");
    let state = state.clone();
    tokio::spawn(async move {
        let mut ready = state.ready_watcher();
        if ready.wait_for(|ready| *ready).await.is_err() {
            return;
        }
        let outcome = quiz_service::generate_and_post_question(&state).await;
        info!(?outcome, "question posted for restored session");
    });
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{dao::models::SessionId, testing::Harness};

    #[tokio::test]
    async fn open_session_is_restored_once() {
        let harness = Harness::new().await;
        harness.store.seed_session(false);
        let open = harness.store.seed_session(true);

        assert!(restore_open_session(&harness.state, &harness.store).await);
        assert_eq!(harness.state.active_session().await, Some(open));

        harness.store.seed_session(true);
        assert!(!restore_open_session(&harness.state, &harness.store).await);
        assert_eq!(harness.state.active_session().await, Some(open));
    }

    #[tokio::test]
    async fn restore_can_be_disabled() {
        let mut config = crate::testing::test_config();
        config.restore_open_session = false;
        let harness = Harness::from_config(config).await;
        harness.store.seed_session(true);

        assert!(!restore_open_session(&harness.state, &harness.store).await);
        assert_eq!(harness.state.active_session().await, None::<SessionId>);
    }

    #[tokio::test]
    async fn store_lookup_failure_leaves_state_untouched() {
        let harness = Harness::new().await;
        harness.store.fail_next(1, false);

        assert!(!restore_open_session(&harness.state, &harness.store).await);
        assert_eq!(harness.state.active_session().await, None);
    }

    #[tokio::test]
    async fn supervisor_installs_store_and_leaves_degraded_mode() {
        let harness = Harness::degraded();
        assert!(harness.state.is_degraded());
        let store = harness.store.clone();

        let task = tokio::spawn(run(harness.state.clone(), move || {
            let store = store.clone();
            async move { Ok(Arc::new(store) as Arc<dyn QuizStore>) }
        }));
        let mut degraded = harness.state.degraded_watcher();
        tokio::time::timeout(Duration::from_secs(1), degraded.wait_for(|flag| !*flag))
            .await
            .expect("store installed")
            .unwrap();
        task.abort();

        assert!(harness.state.store().await.is_some());
    }
}
