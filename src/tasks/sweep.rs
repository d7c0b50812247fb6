//! Pure planning step of a heartbeat sweep.

use uuid::Uuid;

use crate::connection_manager::ConnectionSnapshot;

/// Commands produced by one sweep over a registry snapshot
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepPlan {
    /// Connections to probe (their missed counter is incremented)
    pub probe: Vec<Uuid>,
    /// Connections past the missed probe limit, to be force-closed and evicted
    pub evict: Vec<ConnectionSnapshot>,
}

/// Split a snapshot into probe and eviction commands.
///
/// A connection is dead once it has more than `max_missed_probes`
/// outstanding probes; every other connection is probed again.
pub fn plan_sweep(snapshot: Vec<ConnectionSnapshot>, max_missed_probes: u32) -> SweepPlan {
    let mut plan = SweepPlan::default();
    for conn in snapshot {
        if conn.missed_probes > max_missed_probes {
            plan.evict.push(conn);
        } else {
            plan.probe.push(conn.connection_id);
        }
    }
    plan
}
