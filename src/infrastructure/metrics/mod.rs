//! Prometheus metrics for the presence service.
//!
//! - Registry metrics (live connections, online users)
//! - Transition and status notification metrics
//! - Heartbeat sweep metrics

mod helpers;

pub use helpers::{encode_metrics, HeartbeatMetrics, PresenceMetrics};

use lazy_static::lazy_static;
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};

/// Prefix for all metrics
const METRIC_PREFIX: &str = "presence";

lazy_static! {
    // ============================================================================
    // Registry Metrics
    // ============================================================================

    /// Total number of registered connections
    pub static ref CONNECTIONS_TOTAL: IntGauge = register_int_gauge!(
        format!("{}_connections_total", METRIC_PREFIX),
        "Total number of registered WebSocket connections"
    ).unwrap();

    /// Number of users with at least one live connection
    pub static ref USERS_ONLINE: IntGauge = register_int_gauge!(
        format!("{}_users_online", METRIC_PREFIX),
        "Number of users with at least one live connection"
    ).unwrap();

    // ============================================================================
    // Transition Metrics
    // ============================================================================

    /// Online/offline transitions detected by the registry
    pub static ref TRANSITIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_transitions_total", METRIC_PREFIX),
        "Presence transitions detected",
        &["status"]
    ).unwrap();

    /// Status notification outcomes
    pub static ref NOTIFICATIONS_TOTAL: IntCounterVec = register_int_counter_vec!(
        format!("{}_notifications_total", METRIC_PREFIX),
        "Status notifications by status and outcome",
        &["status", "outcome"]
    ).unwrap();

    // ============================================================================
    // Heartbeat Metrics
    // ============================================================================

    /// Liveness probes sent
    pub static ref HEARTBEAT_PROBES_TOTAL: IntCounter = register_int_counter!(
        format!("{}_heartbeat_probes_total", METRIC_PREFIX),
        "Total liveness probes sent"
    ).unwrap();

    /// Connections evicted for missing probes
    pub static ref HEARTBEAT_EVICTIONS_TOTAL: IntCounter = register_int_counter!(
        format!("{}_heartbeat_evictions_total", METRIC_PREFIX),
        "Total connections evicted by the heartbeat monitor"
    ).unwrap();

    /// Sweep duration
    pub static ref HEARTBEAT_SWEEP_DURATION_MS: Histogram = register_histogram!(
        format!("{}_heartbeat_sweep_duration_ms", METRIC_PREFIX),
        "Heartbeat sweep duration in milliseconds",
        vec![1.0, 5.0, 10.0, 50.0, 100.0, 500.0, 1000.0]
    ).unwrap();
}
