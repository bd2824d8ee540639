//! WebSocket endpoint for live board updates.

use axum::{
    Router,
    extract::{State, WebSocketUpgrade},
    response::IntoResponse,
    routing::get,
};

use crate::{AppState, ws};

pub fn router() -> Router<AppState> {
    Router::new().route("/events/ws", get(stream_events_ws))
}

pub async fn stream_events_ws(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws::session::handle(socket, state))
}
