//! In-process broadcast bus transport.
//!
//! Host and players share one process (same-screen play, tests). Peers get
//! a [`LocalPeer`] handle; dropping it counts as a disconnect.

use super::{PeerEvent, PeerId, Transport};
use crate::protocol::{ClientMessage, ServerMessage};
use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc, Mutex};

pub struct LocalBus {
    token: String,
    updates: broadcast::Sender<ServerMessage>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
    events_rx: Mutex<mpsc::UnboundedReceiver<PeerEvent>>,
}

impl LocalBus {
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

    /// Connect a peer to the bus. The host sees a `Connected` event.
    pub fn connect(&self, peer_id: &str) -> LocalPeer {
        let _ = self.events_tx.send(PeerEvent::Connected {
            peer: peer_id.to_string(),
        });
        LocalPeer {
            peer_id: peer_id.to_string(),
            updates: self.updates.subscribe(),
            events_tx: self.events_tx.clone(),
        }
    }
}

#[async_trait]
impl Transport for LocalBus {
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

/// A player device on the local bus.
pub struct LocalPeer {
    peer_id: PeerId,
    updates: broadcast::Receiver<ServerMessage>,
    events_tx: mpsc::UnboundedSender<PeerEvent>,
}

impl LocalPeer {
    pub fn id(&self) -> &str {
        &self.peer_id
    }

    /// Send a message to the host.
    pub fn send(&self, message: ClientMessage) {
        let _ = self.events_tx.send(PeerEvent::Message {
            peer: self.peer_id.clone(),
            message,
        });
    }

    /// Next update from the host. A lagged receiver skips ahead; the next
    /// full snapshot heals whatever was missed.
    pub async fn recv(&mut self) -> Option<ServerMessage> {
        loop {
            match self.updates.recv().await {
                Ok(message) => return Some(message),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!("Local peer {} lagged by {}", self.peer_id, skipped);
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

impl Drop for LocalPeer {
    fn drop(&mut self) {
        let _ = self.events_tx.send(PeerEvent::Disconnected {
            peer: self.peer_id.clone(),
        });
    }
}
