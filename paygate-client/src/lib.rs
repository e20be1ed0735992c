//! # Paygate Client SDK
//!
//! A typed Rust client for the payment gateway broker API.

use paygate_types::{
    ApiResponse, CountryId, GatewayId, PaymentCallback, PaymentResult, TransactionRequest, UserId,
};
use reqwest::{Client, RequestBuilder};
use rust_decimal::Decimal;
use serde::Serialize;
use serde::de::DeserializeOwned;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const IDEMPOTENCY_KEY_HEADER: &str = "Idempotency-Key";
pub const GATEWAY_KEY_HEADER: &str = "X-Gateway-Api-Key";

/// Error type for client operations.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing credential: {0}")]
    MissingCredential(&'static str),
}

/// Money movement to submit.
#[derive(Debug, Clone)]
pub struct PaymentOrder {
    pub user_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub gateway_id: GatewayId,
    pub country_id: CountryId,
    pub idempotency_key: String,
}

impl PaymentOrder {
    fn body(&self) -> TransactionRequest {
        TransactionRequest {
            amount: self.amount,
            currency: self.currency.clone(),
            gateway_id: self.gateway_id,
            country_id: self.country_id,
            user_id: self.user_id,
            idempotency_key: Some(self.idempotency_key.clone()),
        }
    }
}

/// Paygate API client.
pub struct PaygateClient {
    base_url: String,
    gateway_key: Option<String>,
    http: Client,
}

impl PaygateClient {
    /// Creates a new client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            gateway_key: None,
            http: Client::new(),
        }
    }

    /// Sets the gateway API key used for callbacks.
    pub fn with_gateway_key(mut self, key: impl Into<String>) -> Self {
        self.gateway_key = Some(key.into());
        self
    }

    /// Checks if the API is healthy.
    pub async fn health(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self
            .http
            .get(format!("{}/health", self.base_url))
            .send()
            .await?;
        self.handle_response(resp).await
    }

    /// Starts a deposit and returns the stored transaction id.
    pub async fn deposit(&self, order: &PaymentOrder) -> Result<PaymentResult, ClientError> {
        self.submit("/deposit", order).await
    }

    /// Starts a withdrawal and returns the stored transaction id.
    pub async fn withdraw(&self, order: &PaymentOrder) -> Result<PaymentResult, ClientError> {
        self.submit("/withdraw", order).await
    }

    /// Reports a gateway outcome. Requires a gateway key.
    pub async fn callback(
        &self,
        gateway_txn_id: &str,
        status: &str,
        error_message: Option<String>,
    ) -> Result<ApiResponse<serde_json::Value>, ClientError> {
        let key = self
            .gateway_key
            .as_deref()
            .ok_or(ClientError::MissingCredential("gateway API key"))?;
        let body = PaymentCallback {
            gateway_txn_id: gateway_txn_id.to_string(),
            status: status.to_string(),
            error_message,
            gateway_id: GatewayId::new(0),
        };
        let req = self
            .post("/payment-callback", &body)
            .header(GATEWAY_KEY_HEADER, key);
        self.handle_response(req.send().await?).await
    }

    async fn submit(&self, path: &str, order: &PaymentOrder) -> Result<PaymentResult, ClientError> {
        let req = self
            .post(path, &order.body())
            .header(USER_ID_HEADER, order.user_id.to_string())
            .header(IDEMPOTENCY_KEY_HEADER, &order.idempotency_key);
        let resp: ApiResponse<PaymentResult> = self.handle_response(req.send().await?).await?;
        resp.data.ok_or_else(|| ClientError::Api {
            status: resp.status_code,
            message: "response carried no transaction id".to_string(),
        })
    }

    fn post<B: Serialize>(&self, path: &str, body: &B) -> RequestBuilder {
        self.http
            .post(format!("{}{}", self.base_url, path))
            .json(body)
    }

    async fn handle_response<T: DeserializeOwned>(
        &self,
        resp: reqwest::Response,
    ) -> Result<T, ClientError> {
        let status = resp.status();
        if status.is_success() {
            let body = resp.text().await?;
            Ok(serde_json::from_str(&body)?)
        } else {
            let body = resp.text().await.unwrap_or_default();
            let message = serde_json::from_str::<serde_json::Value>(&body)
                .ok()
                .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(String::from))
                .unwrap_or(body);
            Err(ClientError::Api {
                status: status.as_u16(),
                message,
            })
        }
    }
}
