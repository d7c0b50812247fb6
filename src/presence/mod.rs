mod tracker;

pub use tracker::PresenceTracker;
