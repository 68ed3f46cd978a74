//! The message contract crossing the transport boundary.
//!
//! Every variant is structurally cloneable and serializable; this is the
//! only artifact exchanged between host and players, regardless of which
//! transport carries it.

use crate::types::{GameState, PlayerId};
use serde::{Deserialize, Serialize};

/// Messages sent by player devices to the host.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Join the session. A repeated id is a reconnect, not a duplicate.
    Join {
        id: PlayerId,
        name: String,
        avatar: String,
    },
    /// Vote for a category during category selection. Last write wins.
    VoteCategory { category: String },
    /// Submit (or change) an answer during a question round.
    SubmitAnswer { answer_index: usize },
    /// Ask to advance past a reveal or level-complete screen. The host
    /// advances on the first such request it processes.
    RequestNextStep,
    /// Ask for an immediate snapshot push (reconnect / liveness probe).
    RequestState,
}

/// Messages sent by the host to player devices.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Greeting on connect: protocol version, room token, current snapshot.
    Welcome {
        protocol: String,
        room_token: String,
        state: GameState,
    },
    /// Full snapshot replacing the peer's local view. Peers never receive
    /// diffs, so applying one is always idempotent.
    StateUpdate { state: GameState },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let msg = ClientMessage::SubmitAnswer { answer_index: 2 };
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"t":"submit_answer","answer_index":2}"#);

        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ClientMessage::SubmitAnswer { answer_index: 2 }));
    }

    #[test]
    fn test_join_round_trips() {
        let msg = ClientMessage::Join {
            id: "p1".to_string(),
            name: "Ada".to_string(),
            avatar: "🦊".to_string(),
        };
        let json = serde_json::to_string(&msg).unwrap();
        let back: ClientMessage = serde_json::from_str(&json).unwrap();
        match back {
            ClientMessage::Join { id, name, .. } => {
                assert_eq!(id, "p1");
                assert_eq!(name, "Ada");
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_tag_is_rejected() {
        let result = serde_json::from_str::<ClientMessage>(r#"{"t":"hack_the_host"}"#);
        assert!(result.is_err());
    }
}
