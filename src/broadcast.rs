//! Background tasks: the event pump and the periodic sync broadcaster.
//!
//! Both register their handle with the engine, so `GameEngine::shutdown`
//! tears them down together with the timer.

use crate::engine::{Event, GameEngine};
use crate::transport::Transport;
use std::sync::Arc;
use std::time::Duration;

/// Forward inbound transport events into the dispatcher. Exits when the
/// transport closes.
pub fn spawn_event_pump(engine: Arc<GameEngine>) {
    let handle = tokio::spawn({
        let engine = engine.clone();
        async move {
            while let Some(event) = engine.transport().next_event().await {
                engine.dispatch(Event::Peer(event)).await;
            }
            tracing::info!("Transport closed, event pump stopping");
        }
    });
    engine.track_task(handle);
}

/// Push the full snapshot to all peers on a fixed interval, independent of
/// mutation events. Peers that missed an eager push self-heal within one
/// interval; this is the primary resilience mechanism against unreliable
/// delivery.
pub fn spawn_sync_broadcaster(engine: Arc<GameEngine>) {
    let period = Duration::from_millis(engine.config().sync_interval_ms);
    let handle = tokio::spawn({
        let engine = engine.clone();
        async move {
            let mut interval = tokio::time::interval(period);
            loop {
                interval.tick().await;
                engine.push_snapshot().await;
            }
        }
    });
    engine.track_task(handle);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{ClientMessage, ServerMessage};
    use crate::supplier::FallbackSupplier;
    use crate::transport::local::LocalBus;
    use crate::types::GameConfig;

    #[tokio::test]
    async fn test_pump_applies_peer_messages() {
        let bus = Arc::new(LocalBus::new("ROOM1"));
        let engine = GameEngine::new(
            GameConfig::default(),
            Arc::new(FallbackSupplier::new()),
            bus.clone(),
        );
        spawn_event_pump(engine.clone());

        let mut peer = bus.connect("p1");
        peer.send(ClientMessage::Join {
            id: "p1".to_string(),
            name: "Ada".to_string(),
            avatar: "🦊".to_string(),
        });

        // The join lands, and the eager push echoes back a snapshot
        // containing the new player.
        let deadline = tokio::time::Duration::from_secs(2);
        let joined = tokio::time::timeout(deadline, async {
            loop {
                match peer.recv().await {
                    Some(ServerMessage::StateUpdate { state })
                        if state.player("p1").is_some() =>
                    {
                        return state;
                    }
                    Some(_) => continue,
                    None => panic!("bus closed early"),
                }
            }
        })
        .await
        .expect("snapshot with joined player");

        assert_eq!(joined.players.len(), 1);
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_periodic_broadcast_reaches_idle_peers() {
        let bus = Arc::new(LocalBus::new("ROOM1"));
        let config = GameConfig {
            sync_interval_ms: 20,
            ..GameConfig::default()
        };
        let engine = GameEngine::new(config, Arc::new(FallbackSupplier::new()), bus.clone());
        spawn_sync_broadcaster(engine.clone());

        let mut peer = bus.connect("p1");
        let deadline = tokio::time::Duration::from_secs(2);
        let update = tokio::time::timeout(deadline, peer.recv())
            .await
            .expect("periodic snapshot");
        assert!(matches!(update, Some(ServerMessage::StateUpdate { .. })));
        engine.shutdown();
    }

    #[tokio::test]
    async fn test_shutdown_stops_background_tasks() {
        let bus = Arc::new(LocalBus::new("ROOM1"));
        let config = GameConfig {
            sync_interval_ms: 20,
            ..GameConfig::default()
        };
        let engine = GameEngine::new(config, Arc::new(FallbackSupplier::new()), bus.clone());
        spawn_sync_broadcaster(engine.clone());
        spawn_event_pump(engine.clone());

        let mut peer = bus.connect("p1");
        let deadline = tokio::time::Duration::from_secs(2);
        tokio::time::timeout(deadline, peer.recv())
            .await
            .expect("broadcaster was running");

        engine.shutdown();

        // Drain whatever was already in flight before the abort landed.
        tokio::time::sleep(Duration::from_millis(50)).await;
        for _ in 0..100 {
            let pending =
                tokio::time::timeout(Duration::from_millis(10), peer.recv()).await;
            if pending.is_err() {
                break;
            }
        }

        // Several intervals of silence: the broadcaster is gone.
        let after = tokio::time::timeout(Duration::from_millis(200), peer.recv()).await;
        assert!(after.is_err());
    }
}
