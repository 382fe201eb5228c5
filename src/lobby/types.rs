//! Core data model: members, lobbies and chat entries.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::connection::ConnectionHandle;

/// One connected participant, bound to exactly one lobby.
///
/// Owned by the `SessionRegistry`. The connection handle is shared with the
/// transport task that owns the actual socket.
pub struct Member {
    pub id: Uuid,
    pub display_name: String,
    pub lobby_code: String,
    pub connection: Arc<ConnectionHandle>,
    pub joined_at: DateTime<Utc>,
}

impl Member {
    pub fn new(
        display_name: String,
        lobby_code: String,
        connection: Arc<ConnectionHandle>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            display_name,
            lobby_code,
            connection,
            joined_at: Utc::now(),
        }
    }

    /// Wire-facing view of this member.
    pub fn info(&self) -> MemberInfo {
        MemberInfo {
            id: self.id,
            name: self.display_name.clone(),
            joined_at: self.joined_at,
        }
    }
}

/// Public view of a member as it appears in acks, join events and snapshots.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemberInfo {
    pub id: Uuid,
    pub name: String,
    #[serde(rename = "joinedAt")]
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    System,
    Player,
}

/// One chat history entry. Immutable once appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatEntry {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: EntryKind,
    #[serde(
        rename = "playerId",
        skip_serializing_if = "Option::is_none",
        default
    )]
    pub author_id: Option<Uuid>,
    #[serde(rename = "playerName")]
    pub author_name: String,
    #[serde(rename = "message")]
    pub text: String,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "lobbyCode")]
    pub lobby_code: String,
}

impl ChatEntry {
    /// Entry authored by the server itself (join/leave/disconnect notices).
    pub fn system(text: impl Into<String>, lobby_code: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::System,
            author_id: None,
            author_name: "System".to_string(),
            text: text.into(),
            timestamp: Utc::now(),
            lobby_code: lobby_code.to_string(),
        }
    }

    /// Entry authored by a member; the author name is resolved from the live
    /// member record at send time.
    pub fn member(author: &Member, text: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind: EntryKind::Player,
            author_id: Some(author.id),
            author_name: author.display_name.clone(),
            text: text.into(),
            timestamp: Utc::now(),
            lobby_code: author.lobby_code.clone(),
        }
    }
}

/// A named group session with ordered membership and a chat history.
///
/// Owned by the `LobbyRegistry`; all mutation happens under the per-lobby
/// mutex the registry wraps it in. A lobby with an empty member list is
/// never observable in the registry.
pub struct Lobby {
    pub code: String,
    pub creator_id: Uuid,
    /// Member ids, insertion order = join order, no duplicates.
    pub members: Vec<Uuid>,
    pub history: Vec<ChatEntry>,
    pub created_at: DateTime<Utc>,
}

impl Lobby {
    pub fn new(code: String, creator_id: Uuid) -> Self {
        Self {
            code,
            creator_id,
            members: vec![creator_id],
            history: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Remove a member id; returns whether it was present.
    pub fn remove_member(&mut self, id: Uuid) -> bool {
        let before = self.members.len();
        self.members.retain(|m| *m != id);
        self.members.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// Full current state of a lobby, sent wholesale on any membership change.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LobbySnapshot {
    pub code: String,
    pub players: Vec<MemberInfo>,
    pub messages: Vec<ChatEntry>,
}
