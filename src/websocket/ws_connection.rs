use async_trait::async_trait;
use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;
use std::sync::Arc;
use tokio::sync::{mpsc, Notify};
use tracing::{debug, error};

use crate::fanout::{Connection, ConnectionId, ConnectionState, SendError, StateCell};
use crate::models::SendMessage;

/// `Connection` backed by an axum WebSocket.
///
/// Frames go through a bounded channel drained by `run_writer`, so a client
/// that stops reading makes `send` wait instead of buffering without limit.
pub struct WsConnection {
    id: ConnectionId,
    state: StateCell,
    tx: mpsc::Sender<Message>,
    shutdown: Notify,
}

impl WsConnection {
    pub fn new(buffer: usize) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let (tx, rx) = mpsc::channel(buffer.max(1));
        let conn = Arc::new(Self {
            id: ConnectionId::new(),
            state: StateCell::new(),
            tx,
            shutdown: Notify::new(),
        });
        (conn, rx)
    }

    /// Handshake completed.
    pub fn mark_open(&self) {
        self.state.advance(ConnectionState::Open);
    }

    /// Client sent a close frame.
    pub fn mark_closing(&self) {
        self.state.advance(ConnectionState::Closing);
    }

    /// Transport torn down.
    pub fn mark_closed(&self) {
        self.state.advance(ConnectionState::Closed);
    }

    /// Queue a control frame for this client only.
    pub async fn send_frame(&self, frame: &SendMessage) -> Result<(), SendError> {
        let text = serde_json::to_string(frame).map_err(|e| SendError::Transport(e.to_string()))?;
        self.push(Message::Text(text)).await
    }

    async fn push(&self, message: Message) -> Result<(), SendError> {
        if !self.state.is_sendable() {
            return Err(SendError::Closed);
        }
        self.tx.send(message).await.map_err(|_| SendError::Closed)
    }

    /// Forward queued frames to the socket until the channel closes, the
    /// socket fails or `close` is called.
    pub async fn run_writer(
        self: Arc<Self>,
        mut sink: SplitSink<WebSocket, Message>,
        mut rx: mpsc::Receiver<Message>,
    ) {
        loop {
            tokio::select! {
                next = rx.recv() => {
                    let Some(message) = next else { break };
                    if let Err(e) = sink.send(message).await {
                        error!("WebSocket write failed for connection {}: {}", self.id, e);
                        break;
                    }
                }
                _ = self.shutdown.notified() => {
                    debug!("Closing connection {}", self.id);
                    let _ = sink.send(Message::Close(None)).await;
                    break;
                }
            }
        }
        self.mark_closed();
        let _ = sink.close().await;
    }
}

#[async_trait]
impl Connection for WsConnection {
    fn id(&self) -> &ConnectionId {
        &self.id
    }

    async fn send(&self, payload: Arc<str>) -> Result<(), SendError> {
        self.push(Message::Text(payload.to_string())).await
    }

    fn close(&self) {
        self.state.advance(ConnectionState::Closing);
        self.shutdown.notify_one();
    }

    fn state(&self) -> ConnectionState {
        self.state.get()
    }
}
