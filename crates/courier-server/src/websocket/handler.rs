//! WebSocket upgrade endpoint and per-socket event loop.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::Response;
use courier_core::ids::DeviceId;
use metrics::counter;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::connection::ClientConnection;
use crate::metrics::{WS_CONNECTIONS_TOTAL, WS_DISCONNECTIONS_TOTAL};
use crate::routes::AppState;

const HEARTBEAT_INTERVAL: Duration = Duration::from_secs(30);
const HEARTBEAT_TIMEOUT: Duration = Duration::from_secs(90);

/// Outbound queue depth per socket. A client that falls this far behind
/// starts accruing drops and is eventually disconnected by the broadcaster.
const OUTBOUND_BUFFER: usize = 256;

/// Handshake query parameters for `GET /ws`.
#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Client-supplied stable identity, if any.
    #[serde(rename = "deviceId")]
    pub device_id: Option<String>,
}

/// `GET /ws` upgrade handler. Identity comes from the `deviceId` query
/// parameter when the client supplies one, otherwise a fresh id is minted.
pub async fn ws_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let device_id = query
        .device_id
        .filter(|id| !id.is_empty())
        .map(DeviceId::new)
        .unwrap_or_else(DeviceId::generate);
    ws.on_upgrade(move |socket| handle_socket(state, device_id, socket))
}

async fn handle_socket(state: AppState, device_id: DeviceId, mut socket: WebSocket) {
    counter!(WS_CONNECTIONS_TOTAL).increment(1);
    info!(device_id = %device_id, "websocket session opened");

    let (outbound_tx, mut outbound_rx) = mpsc::channel(OUTBOUND_BUFFER);
    let connection = Arc::new(ClientConnection::new(device_id.clone(), outbound_tx));
    state.router.on_connect(&connection).await;

    let mut heartbeat = tokio::time::interval(HEARTBEAT_INTERVAL);
    heartbeat.reset(); // skip the immediate first tick
    let mut last_pong = Instant::now();

    loop {
        tokio::select! {
            _ = heartbeat.tick() => {
                if last_pong.elapsed() > HEARTBEAT_TIMEOUT {
                    warn!(device_id = %device_id, "heartbeat timeout, disconnecting");
                    break;
                }
                if socket.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }
            outbound = outbound_rx.recv() => {
                let Some(payload) = outbound else { break };
                if socket.send(Message::Text(payload.as_str().into())).await.is_err() {
                    break;
                }
            }
            inbound = socket.recv() => {
                match inbound {
                    Some(Ok(Message::Text(text))) => {
                        connection.touch();
                        state.router.handle_frame(&device_id, text.as_str()).await;
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if socket.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        last_pong = Instant::now();
                        connection.touch();
                    }
                    Some(Ok(Message::Binary(_))) => {
                        debug!(device_id = %device_id, "ignoring binary frame");
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(device_id = %device_id, error = %e, "websocket read error");
                        break;
                    }
                }
            }
        }
    }

    state.router.on_disconnect(&connection).await;
    counter!(WS_DISCONNECTIONS_TOTAL).increment(1);
    info!(device_id = %device_id, "websocket session closed");
}
