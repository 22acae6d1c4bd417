//! HTTP routes.
//!
//! - `POST /update`: submit `{"name", "score"}`; 200 / 400 / 500.
//! - `GET /ws`: websocket upgrade into a push session.
//! - `GET /health`: subscriber count and latest snapshot version.
//! - `GET /`: the configured static page.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Json, Router};
use board_protocol::parse_update;
use serde::Serialize;
use tower_http::services::ServeFile;
use tracing::{debug, warn};

use crate::error::ApiError;
use crate::session::run_session;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let index = ServeFile::new(&state.config.static_file);

    Router::new()
        .route("/update", post(update))
        .route("/ws", get(subscribe))
        .route("/health", get(health))
        .route_service("/", index)
        .with_state(state)
}

async fn update(State(state): State<Arc<AppState>>, body: Bytes) -> Result<StatusCode, ApiError> {
    let entry = parse_update(&body).map_err(|e| {
        debug!(error = %e, "rejected submission");
        ApiError::from(e)
    })?;

    state
        .store
        .upsert(&state.config.leaderboard_key, &entry)
        .await
        .map_err(|e| {
            warn!(name = %entry.name, error = %e, "upsert failed");
            ApiError::from(e)
        })?;

    debug!(name = %entry.name, score = entry.score, "score recorded");
    Ok(StatusCode::OK)
}

async fn subscribe(ws: WebSocketUpgrade, State(state): State<Arc<AppState>>) -> Response {
    ws.on_upgrade(move |socket| run_session(socket, state))
}

#[derive(Debug, Serialize)]
struct Health {
    subscribers: usize,
    version: Option<u64>,
}

async fn health(State(state): State<Arc<AppState>>) -> Json<Health> {
    Json(Health {
        subscribers: state.registry.len().await,
        version: state.producer.latest_version(),
    })
}
