use futures_util::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use super::connection::{ConnectionHandle, SendError};
use super::registry::ConnectionRegistry;
use super::BroadcastError;
use crate::models::QueueMessage;

/// Pushes a message to every live member of its room.
pub struct RoomBroadcaster {
    registry: Arc<ConnectionRegistry>,
    send_timeout: Duration,
}

impl RoomBroadcaster {
    pub fn new(registry: Arc<ConnectionRegistry>, send_timeout: Duration) -> Self {
        Self { registry, send_timeout }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    /// Send `message` to a snapshot of its room and return how many members
    /// received it.
    ///
    /// All sends run concurrently, each bounded by the send timeout. A member
    /// whose send fails or times out is closed and removed from the registry;
    /// the remaining members are unaffected.
    pub async fn broadcast_to_room(&self, message: &QueueMessage) -> Result<usize, BroadcastError> {
        let members = self.registry.members_of(&message.room_id)?;
        if members.is_empty() {
            debug!("Room {} has no members", message.room_id);
            return Ok(0);
        }

        let payload: Arc<str> = serde_json::to_string(message)
            .map_err(|e| BroadcastError::Serialization(e.to_string()))?
            .into();

        let results = join_all(members.iter().map(|member| self.send_one(member, payload.clone()))).await;

        let mut recipient_count = 0;
        for (member, result) in members.iter().zip(results) {
            match result {
                Ok(()) => recipient_count += 1,
                Err(e) => {
                    warn!(
                        "Dropping connection {} from room {}: {}",
                        member.id(),
                        message.room_id,
                        e
                    );
                    member.close();
                    self.registry.remove(member.id());
                }
            }
        }

        debug!(
            "Message {} reached {}/{} member(s) of room {}",
            message.message_id,
            recipient_count,
            members.len(),
            message.room_id
        );
        Ok(recipient_count)
    }

    async fn send_one(&self, member: &ConnectionHandle, payload: Arc<str>) -> Result<(), SendError> {
        if !member.is_open() {
            return Err(SendError::Closed);
        }
        match tokio::time::timeout(self.send_timeout, member.send(payload)).await {
            Ok(result) => result,
            Err(_) => Err(SendError::TimedOut),
        }
    }
}
