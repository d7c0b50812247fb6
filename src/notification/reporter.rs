//! Delivery of status reports to the external collaborator.

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use super::StatusUpdate;

/// Errors that can occur while reporting a status change.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// Transport failure (connect, timeout, body encoding)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The collaborator answered with a non-success status
    #[error("Status endpoint returned {status}: {body}")]
    Status { status: u16, body: String },
}

/// Sink for online/offline transitions
#[async_trait]
pub trait StatusReporter: Send + Sync {
    /// Deliver one status update. Called at most once per transition.
    async fn report(&self, update: &StatusUpdate) -> Result<(), NotifyError>;

    /// Human readable backend name, used in logs and stats
    fn name(&self) -> &'static str;
}

/// POSTs `{ "userId", "status" }` as JSON to a fixed endpoint
pub struct HttpStatusReporter {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpStatusReporter {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
        })
    }
}

#[async_trait]
impl StatusReporter for HttpStatusReporter {
    async fn report(&self, update: &StatusUpdate) -> Result<(), NotifyError> {
        let response = self.client.post(&self.endpoint).json(update).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotifyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}

/// Used when no endpoint is configured: transitions are only logged
pub struct LogStatusReporter;

#[async_trait]
impl StatusReporter for LogStatusReporter {
    async fn report(&self, update: &StatusUpdate) -> Result<(), NotifyError> {
        tracing::info!(
            user_id = %update.user_id,
            status = %update.status,
            "Presence changed (no status endpoint configured)"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
