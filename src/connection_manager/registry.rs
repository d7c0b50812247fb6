use std::collections::HashMap;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use super::stats::{ConnectionStats, UserPresence};
use super::types::{ConnectionEntry, ConnectionSnapshot, Eviction, RegistryError};

#[derive(Default)]
struct RegistryState {
    /// connection_id -> heartbeat state
    connections: HashMap<Uuid, ConnectionEntry>,
    /// user_id -> live connection count (never zero)
    users: HashMap<String, usize>,
}

/// Source of truth for live connections and per-user connection counts
pub struct ConnectionRegistry {
    state: Mutex<RegistryState>,
}

impl ConnectionRegistry {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(RegistryState::default()),
        }
    }

    /// Register a connection for `user_id`.
    ///
    /// Returns `true` when this is the user's first live connection.
    pub async fn admit(&self, connection_id: Uuid, user_id: &str) -> Result<bool, RegistryError> {
        let mut state = self.state.lock().await;

        if state.connections.contains_key(&connection_id) {
            return Err(RegistryError::AlreadyRegistered(connection_id));
        }

        state
            .connections
            .insert(connection_id, ConnectionEntry::new(user_id.to_string()));

        let count = state.users.entry(user_id.to_string()).or_insert(0);
        *count += 1;
        let first = *count == 1;

        tracing::info!(
            connection_id = %connection_id,
            user_id = %user_id,
            user_connections = *count,
            "Connection admitted"
        );

        Ok(first)
    }

    /// Reset the missed probe counter. Returns `false` if the connection is gone.
    pub async fn record_liveness(&self, connection_id: Uuid) -> bool {
        let mut state = self.state.lock().await;
        match state.connections.get_mut(&connection_id) {
            Some(entry) => {
                entry.missed_probes = 0;
                true
            }
            None => false,
        }
    }

    /// Count one more outstanding probe. Returns the new count, or `None`
    /// if the connection was evicted in the meantime.
    pub async fn record_probe(&self, connection_id: Uuid) -> Option<u32> {
        let mut state = self.state.lock().await;
        state.connections.get_mut(&connection_id).map(|entry| {
            entry.missed_probes += 1;
            entry.missed_probes
        })
    }

    /// Remove a connection. Unknown ids return `None`, so repeated evictions
    /// of the same connection only take effect once.
    pub async fn evict(&self, connection_id: Uuid) -> Option<Eviction> {
        let mut state = self.state.lock().await;

        let entry = state.connections.remove(&connection_id)?;

        let remaining = match state.users.get_mut(&entry.user_id) {
            Some(count) => {
                *count = count.saturating_sub(1);
                *count
            }
            None => 0,
        };
        if remaining == 0 {
            state.users.remove(&entry.user_id);
        }

        let session_secs = (Utc::now() - entry.connected_at).num_seconds();
        tracing::info!(
            connection_id = %connection_id,
            user_id = %entry.user_id,
            user_connections = remaining,
            session_secs = session_secs,
            "Connection evicted"
        );

        Some(Eviction {
            connection_id,
            user_id: entry.user_id,
            last_connection: remaining == 0,
        })
    }

    /// Snapshot of every registered connection, taken under the lock
    pub async fn all_connections(&self) -> Vec<ConnectionSnapshot> {
        let state = self.state.lock().await;
        state
            .connections
            .iter()
            .map(|(id, entry)| ConnectionSnapshot {
                connection_id: *id,
                user_id: entry.user_id.clone(),
                missed_probes: entry.missed_probes,
            })
            .collect()
    }

    pub async fn user_presence(&self, user_id: &str) -> UserPresence {
        let count = self
            .state
            .lock()
            .await
            .users
            .get(user_id)
            .copied()
            .unwrap_or(0);
        UserPresence::new(user_id, count)
    }

    pub async fn stats(&self) -> ConnectionStats {
        let state = self.state.lock().await;
        ConnectionStats {
            total_connections: state.connections.len(),
            unique_users: state.users.len(),
        }
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
