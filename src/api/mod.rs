//! API layer - HTTP endpoint handlers.

mod health;
mod metrics;
mod presence;
mod routes;

pub use health::{health, stats};
pub use metrics::prometheus_metrics;
pub use presence::get_user_presence;
pub use routes::api_routes;
