//! Pre-settlement checks: compliance screening and balance lookup.

use rust_decimal::Decimal;

use crate::domain::UserId;
use crate::dto::TransactionRequest;

/// Error type for compliance checks.
#[derive(Debug, thiserror::Error)]
pub enum ComplianceError {
    #[error("Compliance check failed: {0}")]
    Rejected(String),

    #[error("Compliance service unavailable: {0}")]
    Unavailable(String),
}

/// Port trait for compliance screening.
#[async_trait::async_trait]
pub trait ComplianceChecker: Send + Sync {
    /// Screens a request. Returns the checker's status string on approval.
    async fn check(&self, req: &TransactionRequest) -> Result<String, ComplianceError>;
}

/// Error type for balance lookups.
#[derive(Debug, thiserror::Error)]
pub enum BalanceError {
    #[error("Unknown user: {0}")]
    UnknownUser(UserId),

    #[error("Balance service unavailable: {0}")]
    Unavailable(String),
}

/// Port trait for the account service that owns user balances.
#[async_trait::async_trait]
pub trait BalanceProvider: Send + Sync {
    /// Returns the amount currently available for withdrawal.
    async fn balance(&self, user_id: UserId) -> Result<Decimal, BalanceError>;
}
