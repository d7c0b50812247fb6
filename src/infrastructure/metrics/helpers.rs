//! Metrics helper structs for convenient metric recording

use prometheus::{Encoder, TextEncoder};

use super::{
    CONNECTIONS_TOTAL, HEARTBEAT_EVICTIONS_TOTAL, HEARTBEAT_PROBES_TOTAL,
    HEARTBEAT_SWEEP_DURATION_MS, NOTIFICATIONS_TOTAL, TRANSITIONS_TOTAL, USERS_ONLINE,
};

/// Encode all metrics to Prometheus text format
pub fn encode_metrics() -> Result<String, prometheus::Error> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    encoder.encode(&metric_families, &mut buffer)?;
    Ok(String::from_utf8(buffer).unwrap_or_default())
}

/// Helper struct for recording presence metrics
pub struct PresenceMetrics;

impl PresenceMetrics {
    /// Publish registry sizes
    pub fn set_registry_size(connections: usize, users: usize) {
        CONNECTIONS_TOTAL.set(connections as i64);
        USERS_ONLINE.set(users as i64);
    }

    /// Record a transition (`online` or `offline`)
    pub fn record_transition(status: &str) {
        TRANSITIONS_TOTAL.with_label_values(&[status]).inc();
    }

    /// Record a delivered status notification
    pub fn record_notification_delivered(status: &str) {
        NOTIFICATIONS_TOTAL
            .with_label_values(&[status, "delivered"])
            .inc();
    }

    /// Record a failed status notification
    pub fn record_notification_failed(status: &str) {
        NOTIFICATIONS_TOTAL.with_label_values(&[status, "failed"]).inc();
    }
}

/// Helper struct for recording heartbeat metrics
pub struct HeartbeatMetrics;

impl HeartbeatMetrics {
    pub fn record_probes(count: u64) {
        HEARTBEAT_PROBES_TOTAL.inc_by(count);
    }

    pub fn record_evictions(count: u64) {
        HEARTBEAT_EVICTIONS_TOTAL.inc_by(count);
    }

    pub fn record_duration_ms(ms: u64) {
        HEARTBEAT_SWEEP_DURATION_MS.observe(ms as f64);
    }
}
