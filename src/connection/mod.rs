//! Connection handle for a single WebSocket client.

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::websocket::{OutboundFrame, ServerFrame};

/// Handle for one duplex client connection.
///
/// The handle is the non-owning side of the transport: the WebSocket task
/// owns the socket and the receiving end of `sender`. Everything the core
/// needs to know is whether the peer is still there and how to enqueue a
/// frame for it.
pub struct ConnectionHandle {
    pub id: Uuid,
    sender: mpsc::Sender<OutboundFrame>,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionHandle {
    pub fn new(sender: mpsc::Sender<OutboundFrame>) -> Self {
        Self {
            id: Uuid::new_v4(),
            sender,
            connected_at: Utc::now(),
        }
    }

    /// Whether the transport side of this connection still exists.
    pub fn is_open(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Fire-and-forget enqueue of an outbound frame.
    ///
    /// Never blocks: a closed peer or a full outbound buffer drops the frame
    /// rather than stalling the caller. Delivery is best-effort by contract.
    pub fn send(&self, frame: OutboundFrame) {
        if let Err(e) = self.sender.try_send(frame) {
            tracing::debug!(
                connection_id = %self.id,
                error = %e,
                "Dropped outbound frame"
            );
        }
    }

    pub fn send_event(&self, frame: ServerFrame) {
        self.send(OutboundFrame::Event(frame));
    }
}
