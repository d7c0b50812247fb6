//! Registry entry and result types

use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

/// Heartbeat state of one registered connection
#[derive(Debug, Clone)]
pub(crate) struct ConnectionEntry {
    pub user_id: String,
    pub missed_probes: u32,
    pub connected_at: DateTime<Utc>,
}

impl ConnectionEntry {
    pub fn new(user_id: String) -> Self {
        Self {
            user_id,
            missed_probes: 0,
            connected_at: Utc::now(),
        }
    }
}

/// Point-in-time view of a connection, produced for heartbeat sweeps
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionSnapshot {
    pub connection_id: Uuid,
    pub user_id: String,
    pub missed_probes: u32,
}

/// Outcome of removing a registered connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Eviction {
    pub connection_id: Uuid,
    pub user_id: String,
    /// True when this was the user's last live connection
    pub last_connection: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Connection {0} is already registered")]
    AlreadyRegistered(Uuid),
}
