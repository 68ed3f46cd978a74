//! Player join, reconnect and departure handling.

use super::GameEngine;
use crate::types::{GamePhase, Player};
use std::sync::Arc;

impl GameEngine {
    /// Handle a JOIN message.
    ///
    /// A known id is a reconnect in any phase: the player keeps their score
    /// and slot, and only the cosmetic fields refresh. A new id is admitted
    /// in the lobby while capacity remains; otherwise the join is rejected,
    /// but a snapshot still goes out so the rejected client is not left
    /// hanging on a silent socket.
    pub(crate) async fn handle_join(self: &Arc<Self>, id: &str, name: &str, avatar: &str) {
        {
            let mut session = self.session_lock().await;

            if let Some(existing) = session.game.player_mut(id) {
                existing.name = crate::types::sanitize_name(name);
                existing.avatar = crate::types::sanitize_avatar(avatar);
                existing.connected = true;
                tracing::info!("Player {} reconnected", id);
            } else if session.game.phase != GamePhase::Lobby {
                tracing::debug!("Dropping join from unknown id {} outside lobby", id);
            } else if session.game.players.len() >= self.config().max_players {
                tracing::info!("Join from {} rejected: session full", id);
            } else {
                session
                    .game
                    .players
                    .push(Player::new(id.to_string(), name, avatar));
                tracing::info!("Player {} joined", id);
            }
        }
        self.push_snapshot().await;
    }

    /// A transport-level peer arrival. If the peer maps to a known player
    /// this is a reconnect; either way the newcomer gets a snapshot.
    pub(crate) async fn handle_peer_connected(self: &Arc<Self>, peer: &str) {
        {
            let mut session = self.session_lock().await;
            if let Some(player) = session.game.player_mut(peer) {
                player.connected = true;
            }
        }
        self.push_snapshot().await;
    }

    /// A peer departure is never a host fault. In the lobby the player is
    /// removed, freeing the slot for a later joiner; once the game runs the
    /// player stays (they may reconnect with the same id and keep their
    /// score) and is only marked disconnected.
    pub(crate) async fn handle_peer_disconnected(self: &Arc<Self>, peer: &str) {
        {
            let mut session = self.session_lock().await;
            if session.game.phase == GamePhase::Lobby {
                let before = session.game.players.len();
                session.game.players.retain(|p| p.id != peer);
                if session.game.players.len() < before {
                    tracing::info!("Player {} left the lobby", peer);
                }
            } else if let Some(player) = session.game.player_mut(peer) {
                player.connected = false;
                tracing::info!("Player {} disconnected", peer);
            }
        }
        self.push_snapshot().await;
    }
}
