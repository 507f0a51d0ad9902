use std::sync::Arc;

use crate::outcome::SyncOutcome;

/// Errors that can occur when delivering a report.
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("network error: {0}")]
    Network(String),

    #[error("notification rejected: {0}")]
    Rejected(String),
}

/// Delivers the outcome of a run to a notification channel.
#[async_trait::async_trait]
pub trait Reporter: Send + Sync {
    /// Send one message summarising `outcome`.
    async fn send(&self, outcome: &SyncOutcome) -> Result<(), ReportError>;
}

#[async_trait::async_trait]
impl<T: Reporter + ?Sized> Reporter for Arc<T> {
    async fn send(&self, outcome: &SyncOutcome) -> Result<(), ReportError> {
        (**self).send(outcome).await
    }
}
