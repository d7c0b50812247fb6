use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast;

use crate::config::HeartbeatConfig;
use crate::metrics::HeartbeatMetrics;
use crate::presence::PresenceTracker;
use crate::websocket::{CloseReason, ProbeTransport};

use super::sweep::plan_sweep;

/// Result of a single sweep
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub probed: usize,
    pub probe_failures: usize,
    pub evicted: usize,
    pub went_offline: usize,
}

/// Background task that probes every connection once per interval and
/// reclaims the ones that stopped answering
pub struct HeartbeatTask {
    config: HeartbeatConfig,
    tracker: Arc<PresenceTracker>,
    transport: Arc<dyn ProbeTransport>,
    shutdown: broadcast::Receiver<()>,
}

impl HeartbeatTask {
    pub fn new(
        config: HeartbeatConfig,
        tracker: Arc<PresenceTracker>,
        transport: Arc<dyn ProbeTransport>,
        shutdown: broadcast::Receiver<()>,
    ) -> Self {
        Self {
            config,
            tracker,
            transport,
            shutdown,
        }
    }

    /// Run sweeps until shutdown is signalled
    pub async fn run(mut self) {
        let mut timer = tokio::time::interval(self.config.interval());

        // Skip immediate first tick
        timer.tick().await;

        tracing::info!(
            interval_secs = self.config.interval_secs,
            max_missed_probes = self.config.max_missed_probes,
            "Heartbeat task started"
        );

        loop {
            tokio::select! {
                _ = self.shutdown.recv() => {
                    tracing::info!("Heartbeat task received shutdown signal");
                    break;
                }
                _ = timer.tick() => {
                    self.sweep().await;
                }
            }
        }

        tracing::info!("Heartbeat task stopped");
    }

    /// One full pass over a snapshot of the registry
    pub async fn sweep(&self) -> SweepOutcome {
        let start = Instant::now();
        let snapshot = self.tracker.registry().all_connections().await;
        let total = snapshot.len();
        let plan = plan_sweep(snapshot, self.config.max_missed_probes);
        let mut outcome = SweepOutcome::default();

        for dead in &plan.evict {
            self.transport
                .force_close(dead.connection_id, CloseReason::HeartbeatTimeout);

            // Same path as a client-initiated close; a concurrent close may
            // already have evicted it
            if let Some(eviction) = self.tracker.disconnect(dead.connection_id).await {
                outcome.evicted += 1;
                if eviction.last_connection {
                    outcome.went_offline += 1;
                }
                tracing::info!(
                    connection_id = %dead.connection_id,
                    user_id = %dead.user_id,
                    missed_probes = dead.missed_probes,
                    "Evicted unresponsive connection"
                );
            }
        }

        for connection_id in plan.probe {
            // Count the probe before sending it so a fast response is not overwritten
            if self.tracker.record_probe(connection_id).await.is_none() {
                continue;
            }
            if self.transport.send_probe(connection_id) {
                outcome.probed += 1;
            } else {
                outcome.probe_failures += 1;
            }
        }

        let elapsed_ms = start.elapsed().as_millis() as u64;
        HeartbeatMetrics::record_duration_ms(elapsed_ms);
        HeartbeatMetrics::record_probes(outcome.probed as u64);
        if outcome.evicted > 0 {
            HeartbeatMetrics::record_evictions(outcome.evicted as u64);
        }

        if total > 0 {
            tracing::debug!(
                total = total,
                probed = outcome.probed,
                probe_failures = outcome.probe_failures,
                evicted = outcome.evicted,
                elapsed_ms = elapsed_ms,
                "Heartbeat sweep completed"
            );
        }

        outcome
    }
}
