use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

/// Opaque identity of one live client channel.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ConnectionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of a connection. Transitions only move forward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl ConnectionState {
    fn from_u8(value: u8) -> Self {
        match value {
            0 => ConnectionState::Connecting,
            1 => ConnectionState::Open,
            2 => ConnectionState::Closing,
            _ => ConnectionState::Closed,
        }
    }
}

/// Atomic holder for a `ConnectionState`, shared between a transport's reader,
/// writer and the broadcaster.
#[derive(Debug)]
pub struct StateCell(AtomicU8);

impl StateCell {
    pub fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Connecting as u8))
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next` if it is later than the current state.
    /// Returns true when the state changed.
    pub fn advance(&self, next: ConnectionState) -> bool {
        let prev = self.0.fetch_max(next as u8, Ordering::AcqRel);
        prev < next as u8
    }

    pub fn is_sendable(&self) -> bool {
        self.get() == ConnectionState::Open
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SendError {
    #[error("connection is closed")]
    Closed,
    #[error("send timed out")]
    TimedOut,
    #[error("transport error: {0}")]
    Transport(String),
}

/// A live client channel the fan-out engine can push payloads to.
///
/// The engine only depends on this capability, never on a concrete transport.
#[async_trait]
pub trait Connection: Send + Sync {
    fn id(&self) -> &ConnectionId;

    /// Push one framed payload. Fails fast once the connection is closing.
    async fn send(&self, payload: Arc<str>) -> Result<(), SendError>;

    /// Stop accepting sends and tear the transport down.
    fn close(&self);

    fn state(&self) -> ConnectionState;

    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }
}

pub type ConnectionHandle = Arc<dyn Connection>;

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub enum Behavior {
        Deliver,
        Fail,
        Stall,
    }

    /// In-memory connection recording every delivered payload.
    pub struct FakeConnection {
        id: ConnectionId,
        state: StateCell,
        behavior: Behavior,
        received: Mutex<Vec<String>>,
    }

    impl FakeConnection {
        pub fn open(id: &str) -> Arc<Self> {
            Self::with_behavior(id, Behavior::Deliver)
        }

        pub fn with_behavior(id: &str, behavior: Behavior) -> Arc<Self> {
            let conn = Self {
                id: ConnectionId::from(id),
                state: StateCell::new(),
                behavior,
                received: Mutex::new(Vec::new()),
            };
            conn.state.advance(ConnectionState::Open);
            Arc::new(conn)
        }

        pub fn received(&self) -> Vec<String> {
            self.received.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Connection for FakeConnection {
        fn id(&self) -> &ConnectionId {
            &self.id
        }

        async fn send(&self, payload: Arc<str>) -> Result<(), SendError> {
            if !self.state.is_sendable() {
                return Err(SendError::Closed);
            }
            match self.behavior {
                Behavior::Deliver => {
                    self.received.lock().unwrap().push(payload.to_string());
                    Ok(())
                }
                Behavior::Fail => Err(SendError::Transport("broken pipe".to_string())),
                Behavior::Stall => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                    Ok(())
                }
            }
        }

        fn close(&self) {
            self.state.advance(ConnectionState::Closed);
        }

        fn state(&self) -> ConnectionState {
            self.state.get()
        }
    }
}
