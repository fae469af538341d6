use axum::{
    extract::{Path, State, ws::{Message, WebSocket, WebSocketUpgrade}},
    response::Response,
};
use futures_util::StreamExt;
use tracing::{info, error, warn};

use crate::fanout::{Connection, ConnectionHandle};
use crate::models::{ErrorMessage, ReceivedMessage, RoomRequest, SendMessage};
use crate::state::AppState;
use crate::utils::scope_guard::ScopeGuard;
use crate::websocket::msg_ping_handler::handle_ping_message;
use crate::websocket::msg_room_handler::{handle_join_message, handle_leave_message};
use crate::websocket::ws_connection::WsConnection;

/// WebSocket handler for clients that join rooms with explicit frames
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    info!("New WebSocket connection attempt");
    ws.on_upgrade(move |socket| handle_socket(socket, None, state))
}

/// WebSocket handler that joins `room_id` right after the handshake
pub async fn websocket_room_handler(
    Path(room_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> Response {
    info!("New WebSocket connection attempt for room {}", room_id);
    ws.on_upgrade(move |socket| handle_socket(socket, Some(room_id), state))
}

/// Drive one client connection from handshake to teardown
async fn handle_socket(socket: WebSocket, initial_room: Option<String>, state: AppState) {
    let (conn, rx) = WsConnection::new(state.config.connection_buffer);
    let registry = state.registry.clone();
    let connection_id = conn.id().clone();

    // Split the socket and hand the write half to the connection's writer
    let (sink, mut receiver) = socket.split();
    let mut write_task = tokio::spawn(conn.clone().run_writer(sink, rx));

    conn.mark_open();
    registry.register(conn.clone() as ConnectionHandle);
    info!("WebSocket connection {} established", connection_id);

    // Whatever ends this function, the registry must forget the connection
    let _guard = {
        let registry = registry.clone();
        let conn = conn.clone();
        ScopeGuard::new(move || {
            conn.mark_closed();
            registry.remove(conn.id());
            info!("WebSocket connection {} terminated", conn.id());
        })
    };

    if let Some(room_id) = initial_room {
        handle_join_message(&RoomRequest { room_id }, &conn, &registry).await;
    }

    let reader_conn = conn.clone();
    let reader_registry = registry.clone();
    let mut read_task = tokio::spawn(async move {
        while let Some(frame) = receiver.next().await {
            let text = match frame {
                Ok(Message::Text(text)) => text,
                Ok(Message::Close(_)) => {
                    reader_conn.mark_closing();
                    break;
                }
                Ok(_) => continue,
                Err(e) => {
                    warn!("WebSocket read failed for connection {}: {}", reader_conn.id(), e);
                    break;
                }
            };

            let received: ReceivedMessage = match serde_json::from_str(&text) {
                Ok(received) => received,
                Err(e) => {
                    error!("Failed to parse frame from connection {}: {}", reader_conn.id(), e);
                    let reply = SendMessage::Error(ErrorMessage { error: format!("Unrecognized frame: {}", e) });
                    let _ = reader_conn.send_frame(&reply).await;
                    continue;
                }
            };

            match received {
                ReceivedMessage::Join(join_msg) => {
                    handle_join_message(&join_msg, &reader_conn, &reader_registry).await;
                }
                ReceivedMessage::Leave(leave_msg) => {
                    handle_leave_message(&leave_msg, &reader_conn, &reader_registry).await;
                }
                ReceivedMessage::Ping => {
                    handle_ping_message(&reader_conn).await;
                }
            }
        }
    });

    // Wait for either half to finish and stop the other
    tokio::select! {
        _ = (&mut read_task) => {
            conn.close();
            if tokio::time::timeout(std::time::Duration::from_secs(1), &mut write_task).await.is_err() {
                write_task.abort();
            }
        }
        _ = (&mut write_task) => read_task.abort(),
    };
}
