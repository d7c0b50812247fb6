//! Registry statistics and per-user presence views

use serde::Serialize;

/// Registry statistics
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConnectionStats {
    pub total_connections: usize,
    pub unique_users: usize,
}

/// Presence of a single user
#[derive(Debug, Clone, Serialize)]
pub struct UserPresence {
    pub user_id: String,
    pub online: bool,
    pub connection_count: usize,
}

impl UserPresence {
    pub fn new(user_id: impl Into<String>, connection_count: usize) -> Self {
        Self {
            user_id: user_id.into(),
            online: connection_count > 0,
            connection_count,
        }
    }
}
