use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;

use crate::config::SweeperConfig;
use crate::lobby::SessionRegistry;

/// Background task reclaiming members whose connection closed without the
/// disconnect path running.
///
/// The sweep is registry-only: it removes the Member record but does not
/// update lobby member lists and sends no frames. The ids it leaves dangling
/// in `Lobby::members` are skipped by the broadcast engine and snapshots;
/// the disconnect trigger remains the primary cleanup path.
pub struct SweeperTask {
    config: SweeperConfig,
    sessions: Arc<SessionRegistry>,
    shutdown: broadcast::Receiver<()>,
}

impl SweeperTask {
    pub fn new(
        config: SweeperConfig,
        sessions: Arc<SessionRegistry>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            sessions,
            shutdown,
        }
    }

    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(Duration::from_secs(self.config.interval_secs));

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            interval_secs = self.config.interval_secs,
            "Sweeper task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Sweeper task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    self.sweep();
                }
            }
        }

        tracing::info!("Sweeper task stopped");
    }

    /// One pass over the session registry; returns how many members were
    /// reclaimed. Each removal is its own critical section; no lobby lock is
    /// held at any point.
    pub fn sweep(&self) -> usize {
        let mut removed = 0usize;

        for member in self.sessions.values() {
            if !member.connection.is_open() {
                self.sessions.remove(member.id);
                removed += 1;
                tracing::debug!(
                    member_id = %member.id,
                    lobby_code = %member.lobby_code,
                    "Swept stale member"
                );
            }
        }

        if removed > 0 {
            tracing::info!(removed, "Cleaned up stale members");
        }
        removed
    }
}
