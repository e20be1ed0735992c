//! Data Transfer Objects (DTOs) for requests and responses.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{CountryId, GatewayId, TransactionId, UserId};
use crate::error::AppError;

// ─────────────────────────────────────────────────────────────────────────────
// Transaction DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Deposit or withdrawal request.
///
/// `user_id` and `idempotency_key` never come from the body: the inbound
/// adapter fills them from the authenticated caller and request headers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionRequest {
    /// Amount to process, must be positive
    pub amount: Decimal,
    /// Currency code, 1 to 3 characters
    pub currency: String,
    pub gateway_id: GatewayId,
    /// ISO 3166-1 numeric country code
    pub country_id: CountryId,
    #[serde(skip, default = "unknown_user")]
    pub user_id: UserId,
    #[serde(skip)]
    pub idempotency_key: Option<String>,
}

fn unknown_user() -> UserId {
    UserId::new(0)
}

impl TransactionRequest {
    /// Checks the request shape. Business checks (compliance, balance) happen later.
    ///
    /// Currency codes of one or two characters are accepted; only empty codes
    /// and codes longer than three characters are rejected.
    pub fn validate(&self) -> Result<(), AppError> {
        if self.amount <= Decimal::ZERO {
            return Err(AppError::Validation("invalid amount".into()));
        }
        if self.currency.is_empty() || self.currency.chars().count() > 3 {
            return Err(AppError::Validation("invalid currency code".into()));
        }
        if !self.gateway_id.is_valid() {
            return Err(AppError::Validation("invalid gateway id".into()));
        }
        if !self.country_id.is_valid() {
            return Err(AppError::Validation("invalid country id".into()));
        }
        Ok(())
    }
}

/// Result of a successful deposit or withdrawal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentResult {
    pub transaction_id: TransactionId,
}

// ─────────────────────────────────────────────────────────────────────────────
// Callback DTOs
// ─────────────────────────────────────────────────────────────────────────────

/// Asynchronous outcome notification sent by a gateway.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentCallback {
    pub gateway_txn_id: String,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    /// Filled from the authenticated gateway channel, never from the body
    #[serde(skip, default = "unknown_gateway")]
    pub gateway_id: GatewayId,
}

fn unknown_gateway() -> GatewayId {
    GatewayId::new(0)
}

impl PaymentCallback {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.gateway_txn_id.is_empty() {
            return Err(AppError::Validation("invalid transaction id".into()));
        }
        if self.status.is_empty() {
            return Err(AppError::Validation("status is required".into()));
        }
        if !self.gateway_id.is_valid() {
            return Err(AppError::Validation("invalid gateway id".into()));
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Response envelopes
// ─────────────────────────────────────────────────────────────────────────────

/// Successful API response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct ApiResponse<T> {
    pub status_code: u16,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn ok(message: impl Into<String>, data: Option<T>) -> Self {
        Self {
            status_code: 200,
            message: message.into(),
            data,
        }
    }
}

/// Error response: one message plus its status class.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub status_code: u16,
    pub error: String,
}
