use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    routing::get,
};
use tower_http::trace::TraceLayer;

use super::websocket::ws_handler;
use crate::application::{RelayHandle, RelayStatus};

/// Create the relay router: `/status` plus a WebSocket endpoint on every other path
pub fn create_router(relay: RelayHandle) -> Router {
    Router::new()
        .route("/status", get(status))
        .fallback(ws_handler)
        .layer(TraceLayer::new_for_http())
        .with_state(relay)
}

async fn status(State(relay): State<RelayHandle>) -> Result<Json<RelayStatus>, StatusCode> {
    relay
        .status()
        .await
        .map(Json)
        .map_err(|_| StatusCode::SERVICE_UNAVAILABLE)
}
