//! Network seam between the client and the multiplayer server
//!
//! The protocol implementation is a black box; the client only needs to
//! connect, send structured messages and poll for inbound ones.

use serde::{Deserialize, Serialize};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

use super::input::KeyCode;
use crate::helpers::Vec2;

/// Future resolving once the connection handshake completes
pub type Handshake = Pin<Box<dyn Future<Output = Result<(), NetworkError>>>>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum NetworkError {
    #[error("not connected")]
    NotConnected,
    #[error("handshake failed: {0}")]
    Handshake(String),
    #[error("connection closed")]
    Closed,
}

/// Messages the client sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    CreateRoom,
    JoinRoom {
        #[serde(rename = "roomCode")]
        room_code: String,
    },
    Ready,
    Input {
        keys: Vec<KeyCode>,
        #[serde(rename = "mouseDX")]
        mouse_dx: f32,
        #[serde(rename = "mouseDY")]
        mouse_dy: f32,
        fire: bool,
        dt: f32,
    },
}

impl ClientMessage {
    /// The wire `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CreateRoom => "create_room",
            ClientMessage::JoinRoom { .. } => "join_room",
            ClientMessage::Ready => "ready",
            ClientMessage::Input { .. } => "input",
        }
    }
}

/// Remote player state as last reported by the server
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePlayerSnapshot {
    /// Unknown until the server has reported a position
    #[serde(default)]
    pub pos: Option<Vec2>,
    pub alive: bool,
    pub health: f32,
}

/// Messages the server sends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    RoomCreated {
        #[serde(rename = "roomCode")]
        room_code: String,
    },
    RoomJoined {
        #[serde(rename = "roomCode")]
        room_code: String,
    },
    PeerReady,
    MatchStart {
        #[serde(rename = "playerId")]
        player_id: String,
        spawn: Vec2,
        angle: f32,
    },
    State {
        remote: Option<RemotePlayerSnapshot>,
        #[serde(rename = "localTier")]
        local_tier: i32,
        #[serde(rename = "remoteTier")]
        remote_tier: i32,
        #[serde(rename = "matchTime")]
        match_time: f32,
        #[serde(rename = "localHealth")]
        local_health: f32,
    },
    MatchEnd {
        #[serde(rename = "winnerId")]
        winner_id: String,
    },
}

/// Connection manager the client talks to
pub trait NetworkManager {
    fn is_connected(&self) -> bool;

    /// Begin connecting; the returned future resolves when the handshake does.
    /// Calling while already connected resolves immediately.
    fn connect(&self) -> Handshake;

    fn send(&self, message: ClientMessage) -> Result<(), NetworkError>;

    /// Advance the connection by one frame and drain inbound messages
    fn poll(&self) -> Vec<ServerMessage>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_messages_match_wire_format() {
        assert_eq!(
            serde_json::to_value(ClientMessage::CreateRoom).unwrap(),
            json!({ "type": "create_room" })
        );
        assert_eq!(
            serde_json::to_value(ClientMessage::JoinRoom {
                room_code: "ABCD".to_string()
            })
            .unwrap(),
            json!({ "type": "join_room", "roomCode": "ABCD" })
        );
        let input = ClientMessage::Input {
            keys: vec![KeyCode::KeyW, KeyCode::KeyA],
            mouse_dx: 12.5,
            mouse_dy: 0.0,
            fire: true,
            dt: 0.5,
        };
        assert_eq!(
            serde_json::to_value(&input).unwrap(),
            json!({
                "type": "input",
                "keys": ["KeyW", "KeyA"],
                "mouseDX": 12.5,
                "mouseDY": 0.0,
                "fire": true,
                "dt": 0.5
            })
        );
        assert_eq!(input.kind(), "input");
    }
}
