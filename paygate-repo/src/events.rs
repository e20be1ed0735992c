//! Event bus adapters.
//!
//! `LogEventBus` writes events to the tracing log; `HttpEventBus` delivers
//! them to a webhook endpoint, optionally signed.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use paygate_types::EventBus;
use paygate_types::ports::PublishError;

use crate::security::sign_payload;

pub const EVENT_KEY_HEADER: &str = "X-Event-Key";
pub const SIGNATURE_HEADER: &str = "X-Signature";

/// Default bound on a single delivery, connect through response.
pub const DEFAULT_PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Logs every event at `info`. Never fails.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventBus;

#[async_trait]
impl EventBus for LogEventBus {
    async fn publish(&self, key: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
        info!(key, %payload, "Transaction event");
        Ok(())
    }
}

/// POSTs events as JSON to a fixed URL.
///
/// Every delivery is bounded by the client timeout, so an endpoint that never
/// answers shows up as a failure instead of stalling the publisher.
#[derive(Clone)]
pub struct HttpEventBus {
    client: reqwest::Client,
    target_url: String,
    secret: Option<String>,
}

impl HttpEventBus {
    pub fn new(target_url: impl Into<String>, secret: Option<String>) -> reqwest::Result<Self> {
        Self::with_timeout(target_url, secret, DEFAULT_PUBLISH_TIMEOUT)
    }

    pub fn with_timeout(
        target_url: impl Into<String>,
        secret: Option<String>,
        timeout: Duration,
    ) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            target_url: target_url.into(),
            secret,
        })
    }

    pub fn target_url(&self) -> &str {
        &self.target_url
    }
}

#[async_trait]
impl EventBus for HttpEventBus {
    #[instrument(skip(self, payload), fields(url = %self.target_url))]
    async fn publish(&self, key: &str, payload: &serde_json::Value) -> Result<(), PublishError> {
        let body = serde_json::to_vec(payload).map_err(|e| PublishError::Rejected(e.to_string()))?;

        let mut request = self
            .client
            .post(&self.target_url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(EVENT_KEY_HEADER, key);

        if let Some(secret) = &self.secret {
            let signature =
                sign_payload(&body, secret).map_err(|e| PublishError::Rejected(e.to_string()))?;
            request = request.header(SIGNATURE_HEADER, signature);
        }

        let response = request
            .body(body)
            .send()
            .await
            .map_err(|e| PublishError::Unavailable(e.to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(%status, "Event delivered");
            Ok(())
        } else if status.is_client_error() {
            Err(PublishError::Rejected(format!("HTTP {status}")))
        } else {
            Err(PublishError::Unavailable(format!("HTTP {status}")))
        }
    }
}
