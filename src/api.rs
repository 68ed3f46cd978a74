//! HTTP endpoints for the host UI.
//!
//! The "start game" trigger is deliberately not a network message on the
//! player contract; the host display calls it over plain HTTP.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::sync::Arc;

use crate::transport::Transport;
use crate::ws::AppCtx;
use crate::types::{GamePhase, PlayerId};

/// Room info shown on the host screen so players know what to type.
#[derive(Debug, Clone, Serialize)]
pub struct RoomInfo {
    pub room_token: String,
    pub phase: GamePhase,
    pub players: Vec<RoomPlayer>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomPlayer {
    pub id: PlayerId,
    pub name: String,
    pub avatar: String,
    pub connected: bool,
}

/// GET /api/room
pub async fn room_info(State(ctx): State<Arc<AppCtx>>) -> Json<RoomInfo> {
    let state = ctx.engine.snapshot().await;
    Json(RoomInfo {
        room_token: ctx.engine.transport().room_token().to_string(),
        phase: state.phase,
        players: state
            .players
            .iter()
            .map(|p| RoomPlayer {
                id: p.id.clone(),
                name: p.name.clone(),
                avatar: p.avatar.clone(),
                connected: p.connected,
            })
            .collect(),
    })
}

/// POST /api/start
///
/// Host-initiated start trigger. Requires at least one player in the lobby.
pub async fn start_game(State(ctx): State<Arc<AppCtx>>) -> Response {
    match ctx.engine.start_game().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => {
            tracing::warn!("Start rejected: {}", e);
            (StatusCode::CONFLICT, e.to_string()).into_response()
        }
    }
}
