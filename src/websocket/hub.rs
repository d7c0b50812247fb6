//! Per-connection control channels used by the heartbeat monitor.

use dashmap::DashMap;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

use super::message::OutboundMessage;

/// Close codes sent to peers when the server ends a session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    /// Handshake query carried no user identifier
    MissingUserId,
    /// Peer stopped answering liveness probes
    HeartbeatTimeout,
}

impl CloseReason {
    pub fn code(&self) -> u16 {
        match self {
            CloseReason::MissingUserId => 1008,
            CloseReason::HeartbeatTimeout => 1001,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            CloseReason::MissingUserId => "Missing userId",
            CloseReason::HeartbeatTimeout => "heartbeat timeout",
        }
    }
}

/// Transport primitives the heartbeat monitor drives
pub trait ProbeTransport: Send + Sync {
    /// Queue a liveness probe. Returns `false` if it could not be queued.
    fn send_probe(&self, connection_id: Uuid) -> bool;

    /// Ask the transport to terminate the session.
    fn force_close(&self, connection_id: Uuid, reason: CloseReason);
}

/// Hub side of one live session
struct SessionHandle {
    /// Outbound queue of the session's send loop
    sender: mpsc::Sender<OutboundMessage>,
    /// Fired once to make the session drop its socket
    terminate: oneshot::Sender<CloseReason>,
}

/// Routes control frames to live WebSocket sessions
pub struct ConnectionHub {
    sessions: DashMap<Uuid, SessionHandle>,
}

impl ConnectionHub {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Register a session's outbound queue.
    ///
    /// The returned receiver resolves when `force_close` is called for this
    /// connection; the session must then tear down its socket regardless of
    /// how much is still queued.
    pub fn attach(
        &self,
        connection_id: Uuid,
        sender: mpsc::Sender<OutboundMessage>,
    ) -> oneshot::Receiver<CloseReason> {
        let (terminate, terminated) = oneshot::channel();
        self.sessions
            .insert(connection_id, SessionHandle { sender, terminate });
        terminated
    }

    pub fn detach(&self, connection_id: Uuid) {
        self.sessions.remove(&connection_id);
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

impl Default for ConnectionHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ProbeTransport for ConnectionHub {
    fn send_probe(&self, connection_id: Uuid) -> bool {
        let Some(session) = self.sessions.get(&connection_id) else {
            return false;
        };
        match session.sender.try_send(OutboundMessage::Probe) {
            Ok(()) => true,
            Err(e) => {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %e,
                    "Failed to queue probe, connection may be dead"
                );
                false
            }
        }
    }

    fn force_close(&self, connection_id: Uuid, reason: CloseReason) {
        let Some((_, session)) = self.sessions.remove(&connection_id) else {
            return;
        };

        // Best effort: a full queue means the peer is not reading anyway
        if session.sender.try_send(OutboundMessage::Close(reason)).is_err() {
            tracing::debug!(connection_id = %connection_id, "Close frame not queued");
        }
        if session.terminate.send(reason).is_err() {
            tracing::debug!(connection_id = %connection_id, "Session already finished");
        }
    }
}
