//! Broadcast fan-out to the members of a lobby.

use std::sync::Arc;

use smallvec::SmallVec;
use uuid::Uuid;

use crate::websocket::{OutboundFrame, ServerFrame};

use super::registry::{LobbyRegistry, SessionRegistry};
use super::types::{Lobby, LobbySnapshot, Member};

/// Sends a frame to every currently-open connection of a lobby's members.
///
/// Closed connections are silently skipped, never removed here; removal
/// belongs to the leave/disconnect paths and the sweeper. Member ids that no
/// longer resolve (swept mid-flight) are skipped the same way.
pub struct BroadcastEngine {
    sessions: Arc<SessionRegistry>,
    lobbies: Arc<LobbyRegistry>,
}

impl BroadcastEngine {
    pub fn new(sessions: Arc<SessionRegistry>, lobbies: Arc<LobbyRegistry>) -> Self {
        Self { sessions, lobbies }
    }

    /// Fan a frame out over an already-locked lobby, serializing it once.
    ///
    /// Sends are non-blocking enqueues; the lobby lock stays held across the
    /// loop so every receiver sees frames in the same order.
    pub fn broadcast_locked(&self, lobby: &Lobby, frame: &ServerFrame, exclude: Option<Uuid>) {
        let json: Arc<str> = match serde_json::to_string(frame) {
            Ok(s) => s.into(),
            Err(e) => {
                tracing::error!(lobby_code = %lobby.code, error = %e, "Failed to serialize broadcast frame");
                return;
            }
        };

        let recipients: SmallVec<[Arc<Member>; 8]> = lobby
            .members
            .iter()
            .filter(|id| Some(**id) != exclude)
            .filter_map(|id| self.sessions.get(*id))
            .collect();

        for member in recipients {
            if member.connection.is_open() {
                member
                    .connection
                    .send(OutboundFrame::Serialized(json.clone()));
            }
        }
    }

    /// Resolve a lobby by code and broadcast to it. Unknown codes are a no-op.
    pub async fn broadcast(&self, code: &str, frame: &ServerFrame, exclude: Option<Uuid>) {
        if let Some(lobby) = self.lobbies.get(code) {
            let lobby = lobby.lock().await;
            self.broadcast_locked(&lobby, frame, exclude);
        }
    }

    /// Build the wholesale state view of a lobby. Dangling member ids are
    /// left out rather than surfaced as holes.
    pub fn snapshot(&self, lobby: &Lobby) -> LobbySnapshot {
        LobbySnapshot {
            code: lobby.code.clone(),
            players: lobby
                .members
                .iter()
                .filter_map(|id| self.sessions.get(*id))
                .map(|m| m.info())
                .collect(),
            messages: lobby.history.clone(),
        }
    }

    pub fn send_snapshot_locked(&self, lobby: &Lobby) {
        let snapshot = self.snapshot(lobby);
        self.broadcast_locked(lobby, &ServerFrame::LobbyUpdated { data: snapshot }, None);
    }

    /// Convenience: resolve, snapshot, broadcast to the whole lobby.
    pub async fn send_snapshot(&self, code: &str) {
        if let Some(lobby) = self.lobbies.get(code) {
            let lobby = lobby.lock().await;
            self.send_snapshot_locked(&lobby);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::ConnectionHandle;
    use tokio::sync::mpsc;

    struct TestClient {
        member: Arc<Member>,
        rx: mpsc::Receiver<OutboundFrame>,
    }

    fn client(name: &str, code: &str, sessions: &SessionRegistry) -> TestClient {
        let (tx, rx) = mpsc::channel(32);
        let member = Arc::new(Member::new(
            name.to_string(),
            code.to_string(),
            Arc::new(ConnectionHandle::new(tx)),
        ));
        sessions.put(member.clone());
        TestClient { member, rx }
    }

    fn engine() -> (Arc<SessionRegistry>, Arc<LobbyRegistry>, BroadcastEngine) {
        let sessions = Arc::new(SessionRegistry::new());
        let lobbies = Arc::new(LobbyRegistry::new());
        let engine = BroadcastEngine::new(sessions.clone(), lobbies.clone());
        (sessions, lobbies, engine)
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_members() {
        let (sessions, _, engine) = engine();
        let mut alice = client("Alice", "AB12CD", &sessions);
        let mut bob = client("Bob", "AB12CD", &sessions);

        let mut lobby = Lobby::new("AB12CD".to_string(), alice.member.id);
        lobby.members.push(bob.member.id);

        engine.broadcast_locked(&lobby, &ServerFrame::error("ping"), None);

        assert!(alice.rx.try_recv().is_ok());
        assert!(bob.rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let (sessions, _, engine) = engine();
        let mut alice = client("Alice", "AB12CD", &sessions);
        let mut bob = client("Bob", "AB12CD", &sessions);

        let mut lobby = Lobby::new("AB12CD".to_string(), alice.member.id);
        lobby.members.push(bob.member.id);

        engine.broadcast_locked(&lobby, &ServerFrame::error("ping"), Some(alice.member.id));

        assert!(alice.rx.try_recv().is_err());
        assert!(bob.rx.try_recv().is_ok());
    }

    #[tokio::test]
    async fn test_closed_connection_is_skipped_not_removed() {
        let (sessions, _, engine) = engine();
        let mut alice = client("Alice", "AB12CD", &sessions);
        let bob = client("Bob", "AB12CD", &sessions);
        drop(bob.rx); // bob's transport is gone

        let mut lobby = Lobby::new("AB12CD".to_string(), alice.member.id);
        lobby.members.push(bob.member.id);

        engine.broadcast_locked(&lobby, &ServerFrame::error("ping"), None);

        assert!(alice.rx.try_recv().is_ok());
        // skipping is not removal: bob is still registered
        assert!(sessions.get(bob.member.id).is_some());
    }

    #[tokio::test]
    async fn test_broadcast_by_code_and_snapshot() {
        let (sessions, lobbies, engine) = engine();
        let mut alice = client("Alice", "AB12CD", &sessions);
        lobbies.put(Lobby::new("AB12CD".to_string(), alice.member.id));

        engine.broadcast("AB12CD", &ServerFrame::error("ping"), None).await;
        assert!(alice.rx.try_recv().is_ok());

        engine.send_snapshot("AB12CD").await;
        let frame = alice.rx.try_recv().unwrap();
        let decoded: ServerFrame = serde_json::from_str(&frame.to_json().unwrap()).unwrap();
        match decoded {
            ServerFrame::LobbyUpdated { data } => {
                assert_eq!(data.code, "AB12CD");
                assert_eq!(data.players.len(), 1);
            }
            other => panic!("expected LOBBY_UPDATED, got {:?}", other),
        }

        // unknown code is a no-op, not an error
        engine.broadcast("ZZZZZZ", &ServerFrame::error("ping"), None).await;
        engine.send_snapshot("ZZZZZZ").await;
        assert!(alice.rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_dangling_member_id_is_skipped_in_snapshot() {
        let (sessions, _, engine) = engine();
        let alice = client("Alice", "AB12CD", &sessions);
        let bob = client("Bob", "AB12CD", &sessions);

        let mut lobby = Lobby::new("AB12CD".to_string(), alice.member.id);
        lobby.members.push(bob.member.id);

        // bob was swept: registry entry gone, member list still lists him
        sessions.remove(bob.member.id);

        let snapshot = engine.snapshot(&lobby);
        assert_eq!(snapshot.players.len(), 1);
        assert_eq!(snapshot.players[0].name, "Alice");
    }
}
