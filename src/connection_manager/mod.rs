//! Connection registry
//!
//! Owns the connection → heartbeat state map and the user → live connection
//! count map. Every mutation runs under one exclusive lock so the transition
//! flags returned by `admit` and `evict` are computed atomically with the
//! count change they describe.

mod registry;
mod stats;
mod types;

pub use registry::ConnectionRegistry;
pub use stats::{ConnectionStats, UserPresence};
pub use types::{ConnectionSnapshot, Eviction, RegistryError};
