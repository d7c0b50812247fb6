use std::sync::Arc;
use std::time::Instant;

use crate::config::Settings;
use crate::connection_manager::ConnectionRegistry;
use crate::notification::{NotifyError, PresenceNotifier};
use crate::presence::PresenceTracker;
use crate::websocket::ConnectionHub;

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub tracker: Arc<PresenceTracker>,
    pub hub: Arc<ConnectionHub>,
    pub start_time: Instant,
}

impl AppState {
    /// Build the state with the notifier described by `settings.notifier`
    pub fn new(settings: Settings) -> Result<Self, NotifyError> {
        let notifier = Arc::new(PresenceNotifier::from_config(&settings.notifier)?);
        Ok(Self::with_notifier(settings, notifier))
    }

    pub fn with_notifier(settings: Settings, notifier: Arc<PresenceNotifier>) -> Self {
        let registry = Arc::new(ConnectionRegistry::new());
        let tracker = Arc::new(PresenceTracker::new(registry, notifier));

        Self {
            settings: Arc::new(settings),
            tracker,
            hub: Arc::new(ConnectionHub::new()),
            start_time: Instant::now(),
        }
    }
}
