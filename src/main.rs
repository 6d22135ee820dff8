//! Quiz bot binary entrypoint wiring the Discord webhook, OpenAI judge and Supabase store.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use anyhow::Context;
use axum::Router;
use tokio::{net::TcpListener, sync::watch};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use quiz_bot_back::{
    config::AppConfig,
    dao::{
        quiz_store::{
            QuizStore, RetryingStore,
            supabase::{SupabaseConfig, SupabaseQuizStore},
        },
        storage::StorageError,
    },
    judge::OpenAiJudge,
    retry::RetryPolicy,
    routes,
    services::{scheduler, storage_supervisor, transport_supervisor, watchdog},
    state::{AppState, SharedState},
    transport::discord::{DiscordTransport, InteractionVerifier},
};

const DB_RETRY_STEP: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = AppConfig::from_env().context("loading configuration")?;
    let verifier = InteractionVerifier::from_hex(&config.discord.public_key)
        .context("parsing DISCORD_PUBLIC_KEY")?;
    let transport = DiscordTransport::new(&config.discord).context("building Discord client")?;
    let judge = OpenAiJudge::new(config.openai.clone()).context("building OpenAI client")?;

    let port = config.port;
    let supabase = config.supabase.clone();
    let db_policy = RetryPolicy::linear(config.db_max_attempts, DB_RETRY_STEP);
    info!(topics = %config.topics.describe(), "configuration loaded");

    let (app_state, next_questions) = AppState::new(config, Arc::new(judge), Arc::new(transport));
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    tokio::spawn(storage_supervisor::run(app_state.clone(), move || {
        connect_store(supabase.clone(), db_policy)
    }));
    tokio::spawn(transport_supervisor::run(app_state.clone()));
    tokio::spawn(scheduler::run(app_state.clone(), next_questions));
    let watchdog = tokio::spawn(watchdog::run(app_state.clone(), shutdown_rx));

    let app = build_router(app_state, Arc::new(verifier));

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(%addr, "starting server");

    let listener = TcpListener::bind(addr).await.context("binding server")?;
    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("serving axum")?;

    shutdown_tx.send_replace(true);
    watchdog.await.context("joining watchdog")?;
    info!("shutdown complete");

    Ok(())
}

/// Build the Supabase store wrapped in the retrying decorator.
async fn connect_store(
    config: SupabaseConfig,
    policy: RetryPolicy,
) -> Result<Arc<dyn QuizStore>, StorageError> {
    let store = SupabaseQuizStore::new(config)?;
    store.health_check().await?;
    Ok(Arc::new(RetryingStore::new(Arc::new(store), policy)))
}

/// Build the top-level router and attach cross-cutting middleware layers.
fn build_router(state: SharedState, verifier: Arc<InteractionVerifier>) -> Router<()> {
    routes::router(state, verifier).layer(TraceLayer::new_for_http())
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,tower_http=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the server down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = signal(SignalKind::terminate()).expect("install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
