use std::sync::Arc;

use uuid::Uuid;

use crate::connection_manager::{
    ConnectionRegistry, ConnectionStats, Eviction, RegistryError, UserPresence,
};
use crate::metrics::PresenceMetrics;
use crate::notification::{PresenceNotifier, PresenceStatus};

/// Entry point for the transport handler and the heartbeat task.
///
/// Registry state is updated first; the matching status report is dispatched
/// afterwards on a background task.
pub struct PresenceTracker {
    registry: Arc<ConnectionRegistry>,
    notifier: Arc<PresenceNotifier>,
}

impl PresenceTracker {
    pub fn new(registry: Arc<ConnectionRegistry>, notifier: Arc<PresenceNotifier>) -> Self {
        Self { registry, notifier }
    }

    pub fn registry(&self) -> &Arc<ConnectionRegistry> {
        &self.registry
    }

    pub fn notifier(&self) -> &Arc<PresenceNotifier> {
        &self.notifier
    }

    /// Admit a connection; reports `online` on the user's first connection.
    pub async fn connect(&self, connection_id: Uuid, user_id: &str) -> Result<bool, RegistryError> {
        let first = self.registry.admit(connection_id, user_id).await?;
        if first {
            self.notifier.notify(user_id, PresenceStatus::Online);
        }
        self.publish_metrics().await;
        Ok(first)
    }

    /// Liveness response from the peer. Late responses for evicted
    /// connections are ignored.
    pub async fn record_liveness(&self, connection_id: Uuid) -> bool {
        self.registry.record_liveness(connection_id).await
    }

    /// A probe is about to be sent to this connection.
    pub async fn record_probe(&self, connection_id: Uuid) -> Option<u32> {
        self.registry.record_probe(connection_id).await
    }

    /// Close path shared by client disconnects and heartbeat evictions;
    /// reports `offline` when the user's last connection goes away.
    pub async fn disconnect(&self, connection_id: Uuid) -> Option<Eviction> {
        let eviction = self.registry.evict(connection_id).await?;
        if eviction.last_connection {
            self.notifier.notify(&eviction.user_id, PresenceStatus::Offline);
        }
        self.publish_metrics().await;
        Some(eviction)
    }

    pub async fn user_presence(&self, user_id: &str) -> UserPresence {
        self.registry.user_presence(user_id).await
    }

    pub async fn stats(&self) -> ConnectionStats {
        self.registry.stats().await
    }

    async fn publish_metrics(&self) {
        let stats = self.registry.stats().await;
        PresenceMetrics::set_registry_size(stats.total_connections, stats.unique_users);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notification::{NotifyError, StatusReporter, StatusUpdate};
    use async_trait::async_trait;
    use tokio::sync::mpsc;

    struct ChannelReporter {
        tx: mpsc::UnboundedSender<StatusUpdate>,
    }

    #[async_trait]
    impl StatusReporter for ChannelReporter {
        async fn report(&self, update: &StatusUpdate) -> Result<(), NotifyError> {
            let _ = self.tx.send(update.clone());
            Ok(())
        }

        fn name(&self) -> &'static str {
            "channel"
        }
    }

    fn tracker() -> (PresenceTracker, mpsc::UnboundedReceiver<StatusUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Arc::new(PresenceNotifier::new(Arc::new(ChannelReporter { tx })));
        let tracker = PresenceTracker::new(Arc::new(ConnectionRegistry::new()), notifier);
        (tracker, rx)
    }

    #[tokio::test]
    async fn test_one_online_and_one_offline_per_run() {
        let (tracker, mut rx) = tracker();
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        tracker.connect(a, "u1").await.unwrap();
        tracker.connect(b, "u1").await.unwrap();
        tracker.disconnect(a).await;
        tracker.disconnect(b).await;

        let first = rx.recv().await.unwrap();
        let second = rx.recv().await.unwrap();
        // Reports run on separate tasks, so compare as a set
        let mut statuses = vec![first.status, second.status];
        statuses.sort_by_key(|s| s.as_str());
        assert_eq!(statuses, vec![PresenceStatus::Offline, PresenceStatus::Online]);
        assert_eq!(first.user_id, "u1");
        assert_eq!(second.user_id, "u1");

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());

        let stats = tracker.notifier().stats();
        assert_eq!(stats.online_sent, 1);
        assert_eq!(stats.offline_sent, 1);
    }

    #[tokio::test]
    async fn test_double_disconnect_reports_once() {
        let (tracker, mut rx) = tracker();
        let a = Uuid::new_v4();

        tracker.connect(a, "u1").await.unwrap();
        assert!(tracker.disconnect(a).await.is_some());
        assert!(tracker.disconnect(a).await.is_none());

        assert_eq!(tracker.notifier().stats().offline_sent, 1);
        let _online = rx.recv().await.unwrap();
        let _offline = rx.recv().await.unwrap();
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_rejected_admit_sends_nothing() {
        let (tracker, _rx) = tracker();
        let a = Uuid::new_v4();

        tracker.connect(a, "u1").await.unwrap();
        assert!(tracker.connect(a, "u1").await.is_err());
        assert_eq!(tracker.notifier().stats().online_sent, 1);
        assert_eq!(tracker.user_presence("u1").await.connection_count, 1);
    }
}
