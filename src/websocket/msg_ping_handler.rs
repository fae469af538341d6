use tracing::{debug, error};
use chrono::Utc;
use crate::fanout::Connection;
use crate::models::{PongMessage, SendMessage};
use crate::websocket::ws_connection::WsConnection;

/// Handle a ping frame by replying with a pong
pub async fn handle_ping_message(conn: &WsConnection) {
    debug!("Ping received on connection {}", conn.id());

    let pong = SendMessage::Pong(PongMessage { date: Utc::now().to_rfc3339() });
    if let Err(e) = conn.send_frame(&pong).await {
        error!("Failed to send pong to connection {}: {}", conn.id(), e);
    }
}
