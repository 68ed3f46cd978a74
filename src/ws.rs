//! WebSocket endpoint: one socket per peer, bridged onto the transport.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::engine::GameEngine;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::transport::ws::WsTransport;
use crate::transport::{PeerEvent, Transport};

/// Shared context for the HTTP/WebSocket layer.
pub struct AppCtx {
    pub engine: Arc<GameEngine>,
    pub ws: Arc<WsTransport>,
}

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    /// Room token the peer is trying to reach.
    pub room: Option<String>,
    /// Stable player id; absent for the host display, which only watches.
    pub player: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(ctx): State<Arc<AppCtx>>,
) -> impl IntoResponse {
    tracing::info!(
        "WebSocket connection request: room={:?}, player={:?}",
        params.room,
        params.player
    );

    ws.on_upgrade(move |socket| handle_socket(socket, params, ctx))
}

/// Handle individual WebSocket connection
async fn handle_socket(socket: WebSocket, params: WsQuery, ctx: Arc<AppCtx>) {
    let (mut sender, mut receiver) = socket.split();

    // Wrong room token: this peer is looking for a different host.
    if params.room.as_deref() != Some(ctx.ws.room_token()) {
        tracing::info!("Rejecting connection for wrong room {:?}", params.room);
        let _ = sender.close().await;
        return;
    }

    // The host display gets a synthetic peer id; it never sends messages
    // that need one, it just watches snapshots.
    let peer_id = params
        .player
        .clone()
        .unwrap_or_else(|| format!("display-{}", ulid::Ulid::new()));
    let is_player = params.player.is_some();

    // Greet with the current snapshot before anything else so a late
    // joiner renders immediately.
    let welcome = ServerMessage::Welcome {
        protocol: "1.0".to_string(),
        room_token: ctx.ws.room_token().to_string(),
        state: ctx.engine.snapshot().await,
    };
    if let Ok(msg) = serde_json::to_string(&welcome) {
        if sender.send(Message::Text(msg.into())).await.is_err() {
            tracing::error!("Failed to send welcome message");
            return;
        }
    }

    let mut updates = ctx.ws.subscribe();
    let events = ctx.ws.events();

    if is_player {
        let _ = events.send(PeerEvent::Connected {
            peer: peer_id.clone(),
        });
    }

    loop {
        tokio::select! {
            update = updates.recv() => {
                match update {
                    Ok(message) => {
                        if let Ok(json) = serde_json::to_string(&message) {
                            if sender.send(Message::Text(json.into())).await.is_err() {
                                break;
                            }
                        }
                    }
                    // Lagged: skip ahead, the next snapshot self-heals.
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                }
            }

            ws_msg = receiver.next() => {
                match ws_msg {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(message) => {
                                let _ = events.send(PeerEvent::Message {
                                    peer: peer_id.clone(),
                                    message,
                                });
                            }
                            Err(e) => {
                                // Malformed input is a protocol error:
                                // dropped, never fatal.
                                tracing::debug!("Unparseable client message: {}", e);
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) => {
                        tracing::info!("WebSocket closed for {}", peer_id);
                        break;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if sender.send(Message::Pong(data)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        tracing::error!("WebSocket error for {}: {}", peer_id, e);
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    if is_player {
        let _ = events.send(PeerEvent::Disconnected { peer: peer_id });
    }
}
