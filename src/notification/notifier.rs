use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use serde::Serialize;
use tokio::task::JoinHandle;

use crate::config::NotifierConfig;
use crate::metrics::PresenceMetrics;

use super::{
    HttpStatusReporter, LogStatusReporter, NotifyError, PresenceStatus, StatusReporter,
    StatusUpdate,
};

/// Statistics for the presence notifier
#[derive(Debug, Default)]
pub struct NotifierStats {
    pub online_sent: AtomicU64,
    pub offline_sent: AtomicU64,
    pub total_delivered: AtomicU64,
    pub total_failed: AtomicU64,
}

impl NotifierStats {
    pub fn snapshot(&self) -> NotifierStatsSnapshot {
        NotifierStatsSnapshot {
            online_sent: self.online_sent.load(Ordering::Relaxed),
            offline_sent: self.offline_sent.load(Ordering::Relaxed),
            total_delivered: self.total_delivered.load(Ordering::Relaxed),
            total_failed: self.total_failed.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of notifier statistics
#[derive(Debug, Clone, Serialize)]
pub struct NotifierStatsSnapshot {
    pub online_sent: u64,
    pub offline_sent: u64,
    pub total_delivered: u64,
    pub total_failed: u64,
}

/// Emits one best-effort status report per presence transition.
///
/// Reports run on their own tasks; failures are logged and counted but never
/// retried and never fed back into the registry.
pub struct PresenceNotifier {
    reporter: Arc<dyn StatusReporter>,
    stats: Arc<NotifierStats>,
}

impl PresenceNotifier {
    pub fn new(reporter: Arc<dyn StatusReporter>) -> Self {
        Self {
            reporter,
            stats: Arc::new(NotifierStats::default()),
        }
    }

    /// Build the notifier from configuration: HTTP when an endpoint is set,
    /// log-only otherwise.
    pub fn from_config(config: &NotifierConfig) -> Result<Self, NotifyError> {
        let reporter: Arc<dyn StatusReporter> = match &config.endpoint {
            Some(endpoint) => {
                tracing::info!(endpoint = %endpoint, "Status reports will be POSTed");
                Arc::new(HttpStatusReporter::new(endpoint.clone(), config.timeout())?)
            }
            None => {
                tracing::warn!("No status endpoint configured, presence changes are only logged");
                Arc::new(LogStatusReporter)
            }
        };
        Ok(Self::new(reporter))
    }

    pub fn reporter_name(&self) -> &'static str {
        self.reporter.name()
    }

    pub fn stats(&self) -> NotifierStatsSnapshot {
        self.stats.snapshot()
    }

    /// Dispatch a status report without waiting for it.
    ///
    /// Must be called from within a tokio runtime. The returned handle may be
    /// dropped; it exists so callers (and tests) can await delivery.
    pub fn notify(&self, user_id: &str, status: PresenceStatus) -> JoinHandle<()> {
        match status {
            PresenceStatus::Online => self.stats.online_sent.fetch_add(1, Ordering::Relaxed),
            PresenceStatus::Offline => self.stats.offline_sent.fetch_add(1, Ordering::Relaxed),
        };
        PresenceMetrics::record_transition(status.as_str());

        let update = StatusUpdate::new(user_id, status);
        let reporter = self.reporter.clone();
        let stats = self.stats.clone();

        tokio::spawn(async move {
            match reporter.report(&update).await {
                Ok(()) => {
                    stats.total_delivered.fetch_add(1, Ordering::Relaxed);
                    PresenceMetrics::record_notification_delivered(update.status.as_str());
                    tracing::debug!(
                        user_id = %update.user_id,
                        status = %update.status,
                        "Status report delivered"
                    );
                }
                Err(e) => {
                    stats.total_failed.fetch_add(1, Ordering::Relaxed);
                    PresenceMetrics::record_notification_failed(update.status.as_str());
                    tracing::warn!(
                        user_id = %update.user_id,
                        status = %update.status,
                        error = %e,
                        "Failed to report status"
                    );
                }
            }
        })
    }
}
