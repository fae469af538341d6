use tracing::{info, warn, error};
use crate::fanout::{Connection, ConnectionRegistry};
use crate::models::{ErrorMessage, RoomAck, RoomRequest, SendMessage};
use crate::websocket::ws_connection::WsConnection;

/// Handle a join frame
pub async fn handle_join_message(join_msg: &RoomRequest, conn: &WsConnection, registry: &ConnectionRegistry) {
    let reply = match registry.join(conn.id(), &join_msg.room_id) {
        Ok(added) => {
            if added {
                info!("Connection {} joined room {}", conn.id(), join_msg.room_id);
            }
            SendMessage::Joined(RoomAck {
                room_id: join_msg.room_id.clone(),
                rooms: registry.rooms_of(conn.id()),
            })
        }
        Err(e) => {
            warn!("Join rejected for connection {}: {}", conn.id(), e);
            SendMessage::Error(ErrorMessage { error: e.to_string() })
        }
    };
    if let Err(e) = conn.send_frame(&reply).await {
        error!("Failed to acknowledge join for connection {}: {}", conn.id(), e);
    }
}

/// Handle a leave frame
pub async fn handle_leave_message(leave_msg: &RoomRequest, conn: &WsConnection, registry: &ConnectionRegistry) {
    if registry.leave(conn.id(), &leave_msg.room_id) {
        info!("Connection {} left room {}", conn.id(), leave_msg.room_id);
    }
    let reply = SendMessage::Left(RoomAck {
        room_id: leave_msg.room_id.clone(),
        rooms: registry.rooms_of(conn.id()),
    });
    if let Err(e) = conn.send_frame(&reply).await {
        error!("Failed to acknowledge leave for connection {}: {}", conn.id(), e);
    }
}
