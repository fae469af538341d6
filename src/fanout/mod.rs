//! Real-time fan-out engine: connection registry, dedup cache, room
//! broadcaster and the broadcast trigger the queue consumer calls.

pub mod broadcaster;
pub mod connection;
pub mod dedup;
pub mod registry;
pub mod trigger;

use thiserror::Error;

pub use broadcaster::RoomBroadcaster;
pub use connection::{Connection, ConnectionHandle, ConnectionId, ConnectionState, SendError, StateCell};
pub use dedup::DedupCache;
pub use registry::{ConnectionRegistry, RegistryError};
pub use trigger::BroadcastTrigger;

/// Failures that escape the fan-out engine to its caller. Per-connection send
/// failures never show up here.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BroadcastError {
    #[error("malformed message: missing {}", .0.join(", "))]
    MalformedInput(Vec<&'static str>),
    #[error("cannot resolve room: {0}")]
    RoomResolution(String),
    #[error("cannot serialize message: {0}")]
    Serialization(String),
    #[error("broadcast task aborted: {0}")]
    Interrupted(String),
}

impl From<RegistryError> for BroadcastError {
    fn from(e: RegistryError) -> Self {
        BroadcastError::RoomResolution(e.to_string())
    }
}
