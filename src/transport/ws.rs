//! WebSocket-backed transport.
//!
//! This is the bridge half: it holds the outbound fan-out channel the
//! socket tasks subscribe to and the inbound event queue they feed. The
//! axum upgrade handler and per-socket loop live in [`crate::ws`].

use super::{PeerEvent, Transport};
use crate::protocol::ServerMessage;
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};

pub struct WsTransport {
    token: String,
    updates: broadcast::Sender<ServerMessage>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    events_rx: Mutex<mpsc::UnboundedReceiver<PeerEvent>>,
}

impl WsTransport {
    pub fn new(token: &str) -> Self {
        let (updates, _) = broadcast::channel(64);
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        Self {
            token: token.to_string(),
            updates,
            events_tx,
            events_rx: Mutex::new(events_rx),
        }
    }

    /// Subscription for one socket task's outbound side.
    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.updates.subscribe()
    }

    /// Queue used by socket tasks to report peer events.
    pub fn events(&self) -> mpsc::UnboundedSender<PeerEvent> {
        self.events_tx.clone()
    }
}

#[async_trait]
impl Transport for WsTransport {
    fn room_token(&self) -> &str {
        &self.token
    }

    fn deliver(&self, message: ServerMessage) {
        // No receivers connected is fine
        let _ = self.updates.send(message);
    }

    async fn next_event(&self) -> Option<PeerEvent> {
        self.events_rx.lock().await.recv().await
    }
}
