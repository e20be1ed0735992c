//! Event bus port.

/// Error type for event publication.
#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Event bus unavailable: {0}")]
    Unavailable(String),

    #[error("Event rejected by bus: {0}")]
    Rejected(String),
}

/// Port trait for the downstream event transport.
#[async_trait::async_trait]
pub trait EventBus: Send + Sync + 'static {
    /// Publishes one payload under the given topic key.
    async fn publish(&self, key: &str, payload: &serde_json::Value) -> Result<(), PublishError>;
}
