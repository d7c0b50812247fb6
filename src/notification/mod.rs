//! Status notifications for presence transitions.
//!
//! A transition is a user's live connection count crossing between zero and
//! non-zero. Each one produces exactly one `StatusUpdate`, delivered through a
//! `StatusReporter` on a background task.

mod notifier;
mod reporter;
mod types;

pub use notifier::{NotifierStats, NotifierStatsSnapshot, PresenceNotifier};
pub use reporter::{HttpStatusReporter, LogStatusReporter, NotifyError, StatusReporter};
pub use types::{PresenceStatus, StatusUpdate};
