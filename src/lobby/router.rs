//! Command routing: decoded client frames to registry mutations and
//! broadcasts.
//!
//! The router itself is stateless; all state lives in the registries. Every
//! lobby mutation and the broadcasts it triggers happen under that lobby's
//! mutex, so each receiver observes frames for one lobby in a single
//! consistent order.

use std::sync::Arc;

use uuid::Uuid;

use crate::connection::ConnectionHandle;
use crate::error::{LobbyError, Result};
use crate::websocket::{
    ClientFrame, JoinData, PlayerJoinedData, PlayerLeftData, ServerFrame,
};

use super::broadcast::BroadcastEngine;
use super::code;
use super::registry::{LobbyRegistry, SessionRegistry};
use super::types::{ChatEntry, Lobby, Member};

/// Attempts before code generation is reported as an internal fault.
/// With a 36^6 code space this is unreachable in practice.
const MAX_CODE_ATTEMPTS: usize = 32;

enum Departure {
    Leave,
    Disconnect,
}

pub struct MessageRouter {
    sessions: Arc<SessionRegistry>,
    lobbies: Arc<LobbyRegistry>,
    broadcast: Arc<BroadcastEngine>,
}

impl MessageRouter {
    pub fn new(
        sessions: Arc<SessionRegistry>,
        lobbies: Arc<LobbyRegistry>,
        broadcast: Arc<BroadcastEngine>,
    ) -> Self {
        Self {
            sessions,
            lobbies,
            broadcast,
        }
    }

    /// Entry point for one decoded inbound frame from `connection`.
    ///
    /// Failures are reported only to the offending connection as an ERROR
    /// frame; nothing here is fatal to other connections or the process.
    pub async fn dispatch(&self, frame: ClientFrame, connection: &Arc<ConnectionHandle>) {
        let result = match frame {
            ClientFrame::CreateLobby { player_name } => {
                self.create_lobby(player_name, connection).await
            }
            ClientFrame::JoinLobby {
                lobby_code,
                player_name,
            } => self.join_lobby(&lobby_code, player_name, connection).await,
            ClientFrame::SendMessage {
                lobby_code,
                player_id,
                message,
            } => self.send_message(&lobby_code, player_id, message).await,
            ClientFrame::LeaveLobby { player_id } => self.leave_lobby(player_id).await,
        };

        if let Err(e) = result {
            if e.is_internal() {
                tracing::error!(connection_id = %connection.id, error = %e, "Command failed");
            }
            connection.send_event(ServerFrame::error(e.client_message()));
        }
    }

    /// Transport notification that a connection closed without an explicit
    /// leave. Performs exactly the leave transition, with the system entry
    /// text distinguished.
    pub async fn handle_disconnect(&self, connection_id: Uuid) {
        if let Some(member) = self.sessions.member_for_connection(connection_id) {
            self.remove_member(member.id, Departure::Disconnect).await;
        }
    }

    pub async fn create_lobby(
        &self,
        player_name: String,
        connection: &Arc<ConnectionHandle>,
    ) -> Result<()> {
        let lobby_code = self.fresh_code()?;

        let member = Arc::new(Member::new(
            player_name,
            lobby_code.clone(),
            connection.clone(),
        ));
        self.sessions.put(member.clone());

        let mut lobby = Lobby::new(lobby_code.clone(), member.id);
        lobby.history.push(ChatEntry::system(
            format!("Welcome to lobby {}!", lobby_code),
            &lobby_code,
        ));
        let lobby = self.lobbies.put(lobby);
        let lobby = lobby.lock().await;

        // Direct ack precedes the snapshot on the creator's channel.
        connection.send_event(ServerFrame::CreateLobbyAck {
            success: true,
            data: join_data(&member),
        });
        self.broadcast.send_snapshot_locked(&lobby);

        tracing::info!(
            lobby_code = %lobby_code,
            member_id = %member.id,
            "Lobby created"
        );
        Ok(())
    }

    pub async fn join_lobby(
        &self,
        raw_code: &str,
        player_name: String,
        connection: &Arc<ConnectionHandle>,
    ) -> Result<()> {
        let lobby_code = code::normalize(raw_code);
        let lobby = self
            .lobbies
            .get(&lobby_code)
            .ok_or(LobbyError::LobbyNotFound)?;
        let mut lobby = lobby.lock().await;
        // Deleted while we waited for the lock; live lobbies are never empty.
        if lobby.is_empty() {
            return Err(LobbyError::LobbyNotFound);
        }

        let member = Arc::new(Member::new(
            player_name,
            lobby_code.clone(),
            connection.clone(),
        ));
        self.sessions.put(member.clone());
        lobby.members.push(member.id);
        lobby.history.push(ChatEntry::system(
            format!("{} joined the lobby", member.display_name),
            &lobby_code,
        ));

        // Ack to the joiner, then PLAYER_JOINED to the others, then the
        // snapshot to everyone as an idempotent confirmation.
        connection.send_event(ServerFrame::JoinLobbyAck {
            success: true,
            data: join_data(&member),
        });
        self.broadcast.broadcast_locked(
            &lobby,
            &ServerFrame::PlayerJoined {
                data: PlayerJoinedData {
                    player: member.info(),
                },
            },
            Some(member.id),
        );
        self.broadcast.send_snapshot_locked(&lobby);

        tracing::info!(
            lobby_code = %lobby_code,
            member_id = %member.id,
            members = lobby.members.len(),
            "Member joined lobby"
        );
        Ok(())
    }

    pub async fn send_message(
        &self,
        raw_code: &str,
        member_id: Uuid,
        text: String,
    ) -> Result<()> {
        let lobby_code = code::normalize(raw_code);
        let lobby = self
            .lobbies
            .get(&lobby_code)
            .ok_or(LobbyError::InvalidReference)?;
        let member = self
            .sessions
            .get(member_id)
            .ok_or(LobbyError::InvalidReference)?;

        let mut lobby = lobby.lock().await;
        if lobby.is_empty() {
            return Err(LobbyError::InvalidReference);
        }

        let entry = ChatEntry::member(&member, text);
        lobby.history.push(entry.clone());

        // The sender's own message arrives only through this broadcast.
        self.broadcast
            .broadcast_locked(&lobby, &ServerFrame::ChatMessage { data: entry }, None);
        Ok(())
    }

    /// Explicit leave. Idempotent: leaving with an unknown member id is a
    /// silent no-op.
    pub async fn leave_lobby(&self, member_id: Uuid) -> Result<()> {
        self.remove_member(member_id, Departure::Leave).await;
        Ok(())
    }

    async fn remove_member(&self, member_id: Uuid, departure: Departure) {
        let Some(member) = self.sessions.get(member_id) else {
            return;
        };

        if let Some(lobby) = self.lobbies.get(&member.lobby_code) {
            let mut lobby = lobby.lock().await;
            if lobby.remove_member(member.id) {
                let text = match departure {
                    Departure::Leave => format!("{} left the lobby", member.display_name),
                    Departure::Disconnect => format!("{} disconnected", member.display_name),
                };
                let lobby_code = lobby.code.clone();
                lobby.history.push(ChatEntry::system(text, &lobby_code));

                self.broadcast.broadcast_locked(
                    &lobby,
                    &ServerFrame::PlayerLeft {
                        data: PlayerLeftData {
                            player_id: member.id,
                            player_name: member.display_name.clone(),
                        },
                    },
                    None,
                );

                if lobby.is_empty() {
                    // Delete while still holding the lock so a racing join
                    // observes the empty list and is turned away.
                    self.lobbies.remove(&lobby.code);
                    tracing::info!(lobby_code = %lobby.code, "Deleted empty lobby");
                } else {
                    self.broadcast.send_snapshot_locked(&lobby);
                }
            }
        }

        self.sessions.remove(member.id);
        tracing::info!(
            member_id = %member.id,
            lobby_code = %member.lobby_code,
            "Member removed"
        );
    }

    fn fresh_code(&self) -> Result<String> {
        for _ in 0..MAX_CODE_ATTEMPTS {
            let candidate = code::generate();
            if !self.lobbies.contains(&candidate) {
                return Ok(candidate);
            }
        }
        Err(LobbyError::CodeSpaceExhausted(MAX_CODE_ATTEMPTS))
    }
}

fn join_data(member: &Member) -> JoinData {
    JoinData {
        lobby_code: member.lobby_code.clone(),
        player_id: member.id,
        player: member.info(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::websocket::OutboundFrame;
    use tokio::sync::mpsc;
    use tokio_test::assert_ok;

    fn router() -> (Arc<SessionRegistry>, Arc<LobbyRegistry>, MessageRouter) {
        let sessions = Arc::new(SessionRegistry::new());
        let lobbies = Arc::new(LobbyRegistry::new());
        let broadcast = Arc::new(BroadcastEngine::new(sessions.clone(), lobbies.clone()));
        let router = MessageRouter::new(sessions.clone(), lobbies.clone(), broadcast);
        (sessions, lobbies, router)
    }

    fn connect() -> (Arc<ConnectionHandle>, mpsc::Receiver<OutboundFrame>) {
        let (tx, rx) = mpsc::channel(32);
        (Arc::new(ConnectionHandle::new(tx)), rx)
    }

    fn decode(frame: OutboundFrame) -> ServerFrame {
        serde_json::from_str(&frame.to_json().unwrap()).unwrap()
    }

    #[tokio::test]
    async fn test_create_lobby_acks_then_snapshots() {
        let (sessions, lobbies, router) = router();
        let (conn, mut rx) = connect();

        router
            .create_lobby("Alice".to_string(), &conn)
            .await
            .unwrap();

        let ack = decode(rx.try_recv().unwrap());
        let code = match ack {
            ServerFrame::CreateLobbyAck { success, data } => {
                assert!(success);
                assert_eq!(data.player.name, "Alice");
                data.lobby_code
            }
            other => panic!("expected ack, got {:?}", other),
        };

        match decode(rx.try_recv().unwrap()) {
            ServerFrame::LobbyUpdated { data } => {
                assert_eq!(data.code, code);
                assert_eq!(data.players.len(), 1);
                assert_eq!(data.messages.len(), 1);
                assert!(data.messages[0].text.contains("Welcome to lobby"));
            }
            other => panic!("expected snapshot, got {:?}", other),
        }

        assert_eq!(sessions.len(), 1);
        assert!(lobbies.contains(&code));
    }

    #[tokio::test]
    async fn test_join_unknown_code_creates_no_member() {
        let (sessions, _, router) = router();
        let (conn, _rx) = connect();

        let result = router.join_lobby("NOPE99", "Bob".to_string(), &conn).await;
        assert_eq!(result, Err(LobbyError::LobbyNotFound));
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_join_normalizes_code() {
        let (_, _, router) = router();
        let (creator, mut creator_rx) = connect();
        router
            .create_lobby("Alice".to_string(), &creator)
            .await
            .unwrap();
        let code = match decode(creator_rx.try_recv().unwrap()) {
            ServerFrame::CreateLobbyAck { data, .. } => data.lobby_code,
            other => panic!("expected ack, got {:?}", other),
        };

        let (joiner, _joiner_rx) = connect();
        router
            .join_lobby(&code.to_ascii_lowercase(), "Bob".to_string(), &joiner)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_send_message_unknown_member_mutates_nothing() {
        let (_, lobbies, router) = router();
        let (creator, mut rx) = connect();
        router
            .create_lobby("Alice".to_string(), &creator)
            .await
            .unwrap();
        let code = match decode(rx.try_recv().unwrap()) {
            ServerFrame::CreateLobbyAck { data, .. } => data.lobby_code,
            other => panic!("expected ack, got {:?}", other),
        };

        let result = router
            .send_message(&code, Uuid::new_v4(), "hi".to_string())
            .await;
        assert_eq!(result, Err(LobbyError::InvalidReference));

        let lobby = lobbies.get(&code).unwrap();
        let lobby = lobby.lock().await;
        // only the welcome entry
        assert_eq!(lobby.history.len(), 1);
    }

    #[tokio::test]
    async fn test_leave_is_idempotent() {
        let (_, _, router) = router();
        assert_ok!(router.leave_lobby(Uuid::new_v4()).await);
        assert_ok!(router.leave_lobby(Uuid::new_v4()).await);
    }

    #[tokio::test]
    async fn test_last_leave_deletes_lobby() {
        let (sessions, lobbies, router) = router();
        let (conn, mut rx) = connect();
        router
            .create_lobby("Alice".to_string(), &conn)
            .await
            .unwrap();
        let member_id = match decode(rx.try_recv().unwrap()) {
            ServerFrame::CreateLobbyAck { data, .. } => data.player_id,
            other => panic!("expected ack, got {:?}", other),
        };

        router.leave_lobby(member_id).await.unwrap();

        assert!(lobbies.is_empty());
        assert!(sessions.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_resolves_member_by_connection() {
        let (sessions, lobbies, router) = router();
        let (conn, _rx) = connect();
        router
            .create_lobby("Alice".to_string(), &conn)
            .await
            .unwrap();
        assert_eq!(sessions.len(), 1);

        router.handle_disconnect(conn.id).await;

        assert!(sessions.is_empty());
        assert!(lobbies.is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_of_unbound_connection_is_noop() {
        let (_, _, router) = router();
        router.handle_disconnect(Uuid::new_v4()).await;
    }
}
