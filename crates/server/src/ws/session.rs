//! Lifecycle of a single viewer WebSocket connection: registration,
//! join/leave handling, update delivery with stale-version filtering, and
//! keep-alive.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt, stream::SplitSink};
use services::services::version_gate::VersionGate;
use tokio::time::{Instant, MissedTickBehavior, interval};
use uuid::Uuid;

use super::message::{ClientMessage, ServerMessage};
use crate::AppState;

/// Interval between server-initiated ping frames.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Maximum time to wait for a pong before considering the connection dead.
const PONG_TIMEOUT: Duration = Duration::from_secs(90);

pub async fn handle(socket: WebSocket, state: AppState) {
    let (mut sender, mut receiver) = socket.split();
    let connection_id = Uuid::new_v4();
    let mut updates = state.connections().register(connection_id).await;

    tracing::debug!(connection_id = %connection_id, "viewer connected");

    // Announce the server-assigned id so the viewer can tag its move
    // requests with it.
    if send_message(&mut sender, &ServerMessage::Connected { connection_id })
        .await
        .is_err()
    {
        state.connections().unregister(connection_id).await;
        return;
    }

    // Per-session stale filter: out-of-order or duplicate bus deliveries
    // must be a no-op for the viewer.
    let mut gate = VersionGate::new();

    let mut ping_interval = interval(PING_INTERVAL);
    ping_interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Some(update) => {
                        if !gate.admit(update.task.id, update.task.version) {
                            tracing::debug!(
                                connection_id = %connection_id,
                                task_id = %update.task.id,
                                version = update.task.version,
                                "dropping stale update"
                            );
                            continue;
                        }
                        if send_message(&mut sender, &ServerMessage::TaskUpdated(update))
                            .await
                            .is_err()
                        {
                            break;
                        }
                    }
                    None => break,
                }
            }

            msg = receiver.next() => {
                if !handle_client_frame(&state, connection_id, &mut sender, &mut last_pong, msg).await {
                    break;
                }
            }

            _ = ping_interval.tick() => {
                if last_pong.elapsed() > PONG_TIMEOUT {
                    tracing::warn!(
                        connection_id = %connection_id,
                        elapsed_secs = last_pong.elapsed().as_secs(),
                        "pong timeout, closing connection"
                    );
                    break;
                }
                if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
        }
    }

    let _ = sender.send(Message::Close(None)).await;

    // Disconnect reaction: membership in every board goes away with the
    // connection itself.
    state.connections().unregister(connection_id).await;
    tracing::debug!(connection_id = %connection_id, "viewer disconnected");
}

/// Process one inbound frame. Returns false when the session should end.
async fn handle_client_frame(
    state: &AppState,
    connection_id: Uuid,
    sender: &mut SplitSink<WebSocket, Message>,
    last_pong: &mut Instant,
    msg: Option<Result<Message, axum::Error>>,
) -> bool {
    match msg {
        Some(Ok(Message::Text(text))) => {
            match serde_json::from_str::<ClientMessage>(&text) {
                Ok(ClientMessage::JoinBoard { board_id }) => {
                    state.connections().join(board_id, connection_id).await;
                    tracing::debug!(connection_id = %connection_id, board_id = %board_id, "joined board");
                }
                Ok(ClientMessage::LeaveBoard { board_id }) => {
                    state.connections().leave(board_id, connection_id).await;
                }
                Err(e) => {
                    tracing::debug!(connection_id = %connection_id, "ignoring unparseable frame: {e}");
                }
            }
            true
        }
        Some(Ok(Message::Ping(data))) => sender.send(Message::Pong(data)).await.is_ok(),
        Some(Ok(Message::Pong(_))) => {
            *last_pong = Instant::now();
            true
        }
        Some(Ok(Message::Close(_))) => false,
        Some(Ok(_)) => true, // ignore binary frames
        Some(Err(e)) => {
            tracing::debug!(connection_id = %connection_id, "websocket receive error: {e}");
            false
        }
        None => false,
    }
}

async fn send_message(
    sender: &mut SplitSink<WebSocket, Message>,
    message: &ServerMessage,
) -> Result<(), axum::Error> {
    let text = serde_json::to_string(message).map_err(axum::Error::new)?;
    sender.send(Message::Text(text.into())).await
}
