//! Session and lobby registries.
//!
//! Both registries are plain concurrent key-value stores. Lobby records are
//! wrapped in a per-lobby mutex: every mutation of a lobby's member list or
//! history happens under that lock, which is what serializes interleaved
//! join/leave/send on the same lobby.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::types::{Lobby, Member};

/// member id -> Member, plus an explicit index from connection identity to
/// member id for the disconnect reverse lookup.
pub struct SessionRegistry {
    members: DashMap<Uuid, Arc<Member>>,
    by_connection: DashMap<Uuid, Uuid>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            members: DashMap::new(),
            by_connection: DashMap::new(),
        }
    }

    pub fn put(&self, member: Arc<Member>) {
        self.by_connection.insert(member.connection.id, member.id);
        self.members.insert(member.id, member);
    }

    pub fn get(&self, id: Uuid) -> Option<Arc<Member>> {
        self.members.get(&id).map(|m| m.value().clone())
    }

    pub fn remove(&self, id: Uuid) -> Option<Arc<Member>> {
        let (_, member) = self.members.remove(&id)?;
        // Drop the index entry only while it still points at this member;
        // the connection may since have been bound to a newer member.
        self.by_connection
            .remove_if(&member.connection.id, |_, mid| *mid == id);
        Some(member)
    }

    pub fn member_for_connection(&self, connection_id: Uuid) -> Option<Arc<Member>> {
        let member_id = *self.by_connection.get(&connection_id)?;
        self.get(member_id)
    }

    /// Snapshot of all members, for sweep iteration.
    pub fn values(&self) -> Vec<Arc<Member>> {
        self.members.iter().map(|m| m.value().clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}

/// lobby code -> Lobby, each behind its own mutex.
pub struct LobbyRegistry {
    lobbies: DashMap<String, Arc<Mutex<Lobby>>>,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self {
            lobbies: DashMap::new(),
        }
    }

    pub fn put(&self, lobby: Lobby) -> Arc<Mutex<Lobby>> {
        let code = lobby.code.clone();
        let entry = Arc::new(Mutex::new(lobby));
        self.lobbies.insert(code, entry.clone());
        entry
    }

    pub fn get(&self, code: &str) -> Option<Arc<Mutex<Lobby>>> {
        self.lobbies.get(code).map(|l| l.value().clone())
    }

    pub fn remove(&self, code: &str) {
        self.lobbies.remove(code);
    }

    pub fn contains(&self, code: &str) -> bool {
        self.lobbies.contains_key(code)
    }

    pub fn len(&self) -> usize {
        self.lobbies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lobbies.is_empty()
    }
}
