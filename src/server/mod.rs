//! Session gateway
//!
//! Axum HTTP server exposing the WebSocket endpoint plus a small status
//! endpoint for the CLI. One [`Room`] instance backs the whole process.

pub mod ws;

use crate::config::Config;
use crate::room::Room;
use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;

/// Shared handles for request handlers.
#[derive(Clone)]
pub struct AppState {
    pub room: Arc<Room>,
}

/// Build the gateway router.
pub fn build_router(room: Arc<Room>) -> Router {
    let state = AppState { room };
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .route("/status", get(status_handler))
        .with_state(state)
}

/// Run the gateway until ctrl-c.
pub async fn run(config: &Config) -> std::io::Result<()> {
    let room = Arc::new(Room::new(config.room.clone()));
    let router = build_router(room);

    let addr = format!("{}:{}", config.gateway.host, config.gateway.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(%addr, "gateway listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct StatusResponse {
    status: &'static str,
    version: &'static str,
    #[serde(flatten)]
    room: crate::room::RoomStats,
}

async fn status_handler(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        room: state.room.stats(),
    })
}
