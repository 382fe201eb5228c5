//! Wire protocol frames.
//!
//! Field names and the `type` discriminator strings are the compatibility
//! contract with existing clients; everything here serializes to exactly the
//! JSON shapes those clients already speak.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::lobby::{ChatEntry, LobbySnapshot, MemberInfo};

/// Commands decoded from client text frames.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ClientFrame {
    #[serde(rename = "CREATE_LOBBY")]
    CreateLobby {
        #[serde(rename = "playerName")]
        player_name: String,
    },
    #[serde(rename = "JOIN_LOBBY")]
    JoinLobby {
        #[serde(rename = "lobbyCode")]
        lobby_code: String,
        #[serde(rename = "playerName")]
        player_name: String,
    },
    #[serde(rename = "SEND_MESSAGE")]
    SendMessage {
        #[serde(rename = "lobbyCode")]
        lobby_code: String,
        #[serde(rename = "playerId")]
        player_id: Uuid,
        message: String,
    },
    #[serde(rename = "LEAVE_LOBBY")]
    LeaveLobby {
        #[serde(rename = "playerId")]
        player_id: Uuid,
    },
}

/// Frames sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ServerFrame {
    #[serde(rename = "CREATE_LOBBY")]
    CreateLobbyAck { success: bool, data: JoinData },
    #[serde(rename = "JOIN_LOBBY")]
    JoinLobbyAck { success: bool, data: JoinData },
    #[serde(rename = "LOBBY_UPDATED")]
    LobbyUpdated { data: LobbySnapshot },
    #[serde(rename = "CHAT_MESSAGE")]
    ChatMessage { data: ChatEntry },
    #[serde(rename = "PLAYER_JOINED")]
    PlayerJoined { data: PlayerJoinedData },
    #[serde(rename = "PLAYER_LEFT")]
    PlayerLeft { data: PlayerLeftData },
    #[serde(rename = "ERROR")]
    Error { message: String },
}

/// Payload of a successful CREATE_LOBBY / JOIN_LOBBY ack.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinData {
    #[serde(rename = "lobbyCode")]
    pub lobby_code: String,
    #[serde(rename = "playerId")]
    pub player_id: Uuid,
    pub player: MemberInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerJoinedData {
    pub player: MemberInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerLeftData {
    #[serde(rename = "playerId")]
    pub player_id: Uuid,
    #[serde(rename = "playerName")]
    pub player_name: String,
}

impl ServerFrame {
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }
}

/// Outbound frame, either still typed or serialized once for fan-out.
#[derive(Debug, Clone)]
pub enum OutboundFrame {
    Event(ServerFrame),
    /// Pre-serialized JSON shared across many receivers of one broadcast.
    Serialized(Arc<str>),
}

impl OutboundFrame {
    pub fn to_json(&self) -> serde_json::Result<String> {
        match self {
            Self::Event(frame) => serde_json::to_string(frame),
            Self::Serialized(json) => Ok(json.to_string()),
        }
    }
}
