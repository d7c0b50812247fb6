mod heartbeat;
mod sweep;

pub use heartbeat::{HeartbeatTask, SweepOutcome};
pub use sweep::{plan_sweep, SweepPlan};
