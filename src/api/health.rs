//! Health check and statistics endpoints.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::notification::NotifierStatsSnapshot;
use crate::server::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_seconds: u64,
    pub connections: ConnectionHealthResponse,
}

#[derive(Debug, Serialize)]
pub struct ConnectionHealthResponse {
    pub total: usize,
    pub online_users: usize,
}

#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub connections: ConnectionHealthResponse,
    pub notifications: NotificationStats,
    pub heartbeat: HeartbeatStats,
}

#[derive(Debug, Serialize)]
pub struct NotificationStats {
    pub reporter: String,
    #[serde(flatten)]
    pub counters: NotifierStatsSnapshot,
}

#[derive(Debug, Serialize)]
pub struct HeartbeatStats {
    pub interval_secs: u64,
    pub max_missed_probes: u32,
    /// Sessions the heartbeat can currently reach
    pub attached_sessions: usize,
}

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let conn_stats = state.tracker.stats().await;

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.start_time.elapsed().as_secs(),
        connections: ConnectionHealthResponse {
            total: conn_stats.total_connections,
            online_users: conn_stats.unique_users,
        },
    })
}

pub async fn stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let conn_stats = state.tracker.stats().await;
    let notifier = state.tracker.notifier();

    Json(StatsResponse {
        connections: ConnectionHealthResponse {
            total: conn_stats.total_connections,
            online_users: conn_stats.unique_users,
        },
        notifications: NotificationStats {
            reporter: notifier.reporter_name().to_string(),
            counters: notifier.stats(),
        },
        heartbeat: HeartbeatStats {
            interval_secs: state.settings.heartbeat.interval_secs,
            max_missed_probes: state.settings.heartbeat.max_missed_probes,
            attached_sessions: state.hub.len(),
        },
    })
}
