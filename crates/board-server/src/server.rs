//! Listener and top-level server wiring.
//!
//! This module:
//! - Binds the configured address/port (or takes a pre-bound listener).
//! - Builds the store, the change source, and the shared [`AppState`].
//! - Spawns the single broadcast loop.
//! - Serves HTTP until the shutdown future completes, then cancels every
//!   session and the broadcast loop and closes the registry.
//!
//! Per-connection logic lives in `session`, the loop in `broadcaster`.

use std::future::Future;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::broadcaster::{run_broadcast_loop, Broadcaster};
use crate::change::build_change_source;
use crate::config::Config;
use crate::http::router;
use crate::state::AppState;
use crate::store::{build_store, ScoreStore};

/// Bind `config`'s address and serve until `shutdown` completes.
pub async fn run<F>(config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = config.socket_addr_string();
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("binding {addr}"))?;
    serve(listener, config, shutdown).await
}

/// Serve on an already bound listener with the store `config` selects.
pub async fn serve<F>(listener: TcpListener, config: Config, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let store = build_store(&config);
    serve_with_store(listener, config, store, shutdown).await
}

/// Serve on an already bound listener with a caller-provided store.
pub async fn serve_with_store<F>(
    listener: TcpListener,
    config: Config,
    store: Arc<dyn ScoreStore>,
    shutdown: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    config.validate()?;

    let source = build_change_source(&config, store.as_ref())
        .await
        .with_context(|| format!("starting {} trigger on {} store", config.trigger, store.name()))?;

    let state = Arc::new(AppState::new(config, store));

    let broadcast_task = {
        let broadcaster = Broadcaster::new(state.registry.clone());
        tokio::spawn(run_broadcast_loop(
            source,
            state.producer.clone(),
            broadcaster,
            state.config.retry_delay(),
            state.cancel.clone(),
        ))
    };

    info!(
        addr = %listener.local_addr()?,
        store = state.store.name(),
        key = %state.config.leaderboard_key,
        top_k = state.config.top_k,
        "listening"
    );

    let cancel = state.cancel.clone();
    let served = axum::serve(listener, router(state.clone()))
        .with_graceful_shutdown(async move {
            shutdown.await;
            info!("shutdown requested");
            // Sessions hold their connections open; end them first.
            cancel.cancel();
        })
        .await;

    state.cancel.cancel();
    let closed = state.registry.close_all().await;
    if let Err(e) = broadcast_task.await {
        error!(error = %e, "broadcast loop panicked");
    }
    info!(closed, "server stopped");

    served.context("serving http")
}
