//! WebSocket upgrade handler

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::app::AppState;
use crate::game::{ArenaHandle, Intent};
use crate::util::rate_limit::ConnectionRateLimiter;
use crate::ws::broadcast::Outbound;
use crate::ws::protocol::{ClientMsg, SessionId};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection: one socket is one session
async fn handle_socket(socket: WebSocket, state: AppState) {
    let arena = state.arena.clone();
    let session_id = arena.next_session_id();
    info!(session_id = %session_id, "New WebSocket connection");

    let (ws_sink, ws_stream) = socket.split();

    // Subscribe before joining so the join snapshot is not missed
    let outbound_rx = arena.subscribe();

    if arena.send(session_id, Intent::Join).await.is_err() {
        error!(session_id = %session_id, "Arena unavailable, closing connection");
        return;
    }

    let rate_limiter = ConnectionRateLimiter::new(state.config.input_rate_limit);
    run_session(session_id, &arena, ws_sink, ws_stream, outbound_rx, rate_limiter).await;

    info!(session_id = %session_id, "WebSocket connection closed");
}

/// Run the WebSocket session with read/write split
async fn run_session(
    session_id: SessionId,
    arena: &ArenaHandle,
    mut ws_sink: SplitSink<WebSocket, Message>,
    mut ws_stream: SplitStream<WebSocket>,
    mut outbound_rx: broadcast::Receiver<Outbound>,
    rate_limiter: ConnectionRateLimiter,
) {
    // Spawn writer task: arena fan-out -> WebSocket
    let writer_handle = tokio::spawn(async move {
        loop {
            match outbound_rx.recv().await {
                Ok(outbound) => {
                    if !outbound.target.includes(session_id) {
                        continue;
                    }
                    if let Err(e) = ws_sink.send(Message::Text(outbound.payload.to_string())).await {
                        debug!(session_id = %session_id, error = %e, "WebSocket send failed");
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!(
                        session_id = %session_id,
                        lagged_count = n,
                        "Client lagged, skipping {} messages", n
                    );
                    // Continue - don't disconnect for lag
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(session_id = %session_id, "Outbound channel closed");
                    break;
                }
            }
        }
    });

    // Reader loop: WebSocket -> arena
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => {
                if !rate_limiter.check_input() {
                    warn!(session_id = %session_id, "Rate limited input message");
                    continue;
                }

                match ClientMsg::decode(&text) {
                    Ok(msg) => {
                        debug!(session_id = %session_id, ?msg, "Client intent");
                        if arena.send(session_id, Intent::Client(msg)).await.is_err() {
                            debug!(session_id = %session_id, "Arena input closed");
                            break;
                        }
                    }
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "Failed to parse client message");
                    }
                }
            }
            Ok(Message::Binary(_)) => {
                warn!(session_id = %session_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(session_id = %session_id, "Client initiated close");
                break;
            }
            Err(e) => {
                warn!(session_id = %session_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Signal disconnect to the arena
    let _ = arena.send(session_id, Intent::Disconnect).await;

    writer_handle.abort();
}
