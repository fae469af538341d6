use axum::{extract::{rejection::JsonRejection, State}, http::StatusCode, Json};
use tracing::{debug, error, warn};

use crate::fanout::BroadcastError;
use crate::models::QueueMessage;
use crate::state::AppState;

/// Called by the queue consumer after it persisted a message
pub async fn broadcast_message(
    State(state): State<AppState>,
    payload: Result<Json<QueueMessage>, JsonRejection>,
) -> (StatusCode, String) {
    let Json(message) = match payload {
        Ok(payload) => payload,
        Err(rejection) => {
            warn!("Rejected broadcast request: {}", rejection.body_text());
            return (StatusCode::BAD_REQUEST, format!("Invalid message: {}", rejection.body_text()));
        }
    };

    debug!("Broadcast request received for room {} from consumer", message.room_id);

    match state.trigger.trigger(&message).await {
        Ok(0) => {
            debug!("No active clients in room {} to broadcast to", message.room_id);
            (StatusCode::OK, "No active clients in room".to_string())
        }
        Ok(recipient_count) => {
            debug!(
                "Successfully broadcasted message {} to {} clients in room {}",
                message.message_id, recipient_count, message.room_id
            );
            (StatusCode::OK, format!("Broadcasted to {} clients", recipient_count))
        }
        Err(e @ BroadcastError::MalformedInput(_)) => {
            warn!("Rejected broadcast request: {}", e);
            (StatusCode::BAD_REQUEST, format!("Invalid message: {}", e))
        }
        Err(e) => {
            error!("Failed to broadcast message {}: {}", message.message_id, e);
            (StatusCode::INTERNAL_SERVER_ERROR, format!("Broadcast failed: {}", e))
        }
    }
}

/// Health check for the broadcast API
pub async fn broadcast_health() -> &'static str {
    "Broadcast API is healthy"
}
