use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::lobby::{BroadcastEngine, LobbyRegistry, MessageRouter, SessionRegistry};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub sessions: Arc<SessionRegistry>,
    pub lobbies: Arc<LobbyRegistry>,
    pub broadcast: Arc<BroadcastEngine>,
    pub router: Arc<MessageRouter>,
    pub started_at: Instant,
}

impl AppState {
    pub fn new(settings: Settings) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let lobbies = Arc::new(LobbyRegistry::new());
        let broadcast = Arc::new(BroadcastEngine::new(sessions.clone(), lobbies.clone()));
        let router = Arc::new(MessageRouter::new(
            sessions.clone(),
            lobbies.clone(),
            broadcast.clone(),
        ));

        Self {
            settings: Arc::new(settings),
            sessions,
            lobbies,
            broadcast,
            router,
            started_at: Instant::now(),
        }
    }
}
