//! Transport adapter contract.
//!
//! The engine talks to peers through exactly one interface: deliver a
//! message to everyone, and consume inbound peer events. The in-process
//! bus and the WebSocket transport are interchangeable implementations;
//! nothing in the engine branches on which one is active.
//!
//! Delivery guarantees assumed by the engine: at-least-once, FIFO per
//! peer, no ordering across peers. Every handler is idempotent or
//! last-write-wins accordingly.

pub mod local;
pub mod ws;

use crate::protocol::{ClientMessage, ServerMessage};
use async_trait::async_trait;
use rand::Rng;

pub type PeerId = String;

/// Something a peer did, as seen by the host.
#[derive(Debug, Clone)]
pub enum PeerEvent {
    Connected { peer: PeerId },
    Disconnected { peer: PeerId },
    Message { peer: PeerId, message: ClientMessage },
}

#[async_trait]
pub trait Transport: Send + Sync {
    /// Short opaque code identifying this host session to joining peers.
    fn room_token(&self) -> &str;

    /// Deliver a message to every currently connected peer. Best effort;
    /// an unreachable peer is a departure, not an error.
    fn deliver(&self, message: ServerMessage);

    /// Next inbound peer event. Returns `None` once the transport closed.
    async fn next_event(&self) -> Option<PeerEvent>;
}

/// Safe character set for room tokens (excludes 0/O, 1/I/L to avoid confusion)
const TOKEN_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const TOKEN_LENGTH: usize = 5;

/// Generate a random room token (5 characters)
pub fn generate_room_token() -> String {
    let mut rng = rand::rng();
    (0..TOKEN_LENGTH)
        .map(|_| TOKEN_CHARS[rng.random_range(0..TOKEN_CHARS.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_token_shape() {
        let token = generate_room_token();
        assert_eq!(token.len(), TOKEN_LENGTH);
        assert!(token.bytes().all(|b| TOKEN_CHARS.contains(&b)));
    }

    #[test]
    fn test_room_tokens_vary() {
        let tokens: std::collections::HashSet<_> =
            (0..50).map(|_| generate_room_token()).collect();
        assert!(tokens.len() > 1);
    }
}
