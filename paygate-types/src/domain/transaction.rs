//! Transaction domain model.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::ids::{CountryId, GatewayId, TransactionId, UserId};
use crate::dto::TransactionRequest;
use crate::error::DomainError;

/// Direction of money movement. Immutable after creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    /// Money coming into the user's account from a gateway
    Deposit,
    /// Money leaving the user's account through a gateway
    Withdraw,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Deposit => "deposit",
            TransactionKind::Withdraw => "withdraw",
        }
    }
}

impl std::fmt::Display for TransactionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionKind {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "deposit" => Ok(TransactionKind::Deposit),
            "withdraw" => Ok(TransactionKind::Withdraw),
            other => Err(DomainError::Validation(format!(
                "unknown transaction type: {other}"
            ))),
        }
    }
}

/// Lifecycle status of a stored transaction.
///
/// `Pending` is assigned when the gateway accepts the payment; the terminal
/// states only ever arrive through a gateway callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Pending,
    Completed,
    Failed,
}

impl TransactionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Pending => "pending",
            TransactionStatus::Completed => "completed",
            TransactionStatus::Failed => "failed",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, TransactionStatus::Completed | TransactionStatus::Failed)
    }

    /// Transition table: `pending -> completed`, `pending -> failed`.
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(
            (self, next),
            (
                TransactionStatus::Pending,
                TransactionStatus::Completed | TransactionStatus::Failed
            )
        )
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TransactionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(TransactionStatus::Pending),
            "completed" => Ok(TransactionStatus::Completed),
            "failed" => Ok(TransactionStatus::Failed),
            other => Err(DomainError::Validation(format!(
                "unknown transaction status: {other}"
            ))),
        }
    }
}

/// How strictly callback status updates are checked against the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionPolicy {
    /// Only the transition table of [`TransactionStatus::can_transition_to`] is accepted.
    #[default]
    Strict,
    /// Any status different from the current one is applied as-is.
    Permissive,
}

impl TransitionPolicy {
    pub fn check(&self, from: TransactionStatus, to: TransactionStatus) -> Result<(), DomainError> {
        match self {
            TransitionPolicy::Permissive => Ok(()),
            TransitionPolicy::Strict if from.can_transition_to(to) => Ok(()),
            TransitionPolicy::Strict => Err(DomainError::InvalidTransition { from, to }),
        }
    }
}

impl std::str::FromStr for TransitionPolicy {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "strict" => Ok(TransitionPolicy::Strict),
            "permissive" => Ok(TransitionPolicy::Permissive),
            other => Err(DomainError::Validation(format!(
                "unknown transition policy: {other}"
            ))),
        }
    }
}

/// One money-movement attempt.
///
/// Built in memory by the orchestrator, stamped with the gateway's reference
/// once the gateway accepts it, and only then persisted (which assigns `id`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Store-assigned identity; `None` until persisted
    pub id: Option<TransactionId>,
    pub amount: Decimal,
    pub currency: String,
    #[serde(rename = "type")]
    pub kind: TransactionKind,
    pub user_id: UserId,
    pub gateway_id: GatewayId,
    pub country_id: CountryId,
    /// `None` while the transaction has not been accepted by a gateway
    pub status: Option<TransactionStatus>,
    /// Reference returned by the gateway; the key for callback lookups
    pub gateway_txn_id: Option<String>,
    /// Caller-supplied token, recorded but not deduplicated
    pub idempotency_key: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Transaction {
    /// Creates a transient deposit for the given request.
    pub fn deposit(req: &TransactionRequest) -> Self {
        Self::transient(TransactionKind::Deposit, req)
    }

    /// Creates a transient withdrawal for the given request.
    pub fn withdraw(req: &TransactionRequest) -> Self {
        Self::transient(TransactionKind::Withdraw, req)
    }

    fn transient(kind: TransactionKind, req: &TransactionRequest) -> Self {
        Self {
            id: None,
            amount: req.amount,
            currency: req.currency.clone(),
            kind,
            user_id: req.user_id,
            gateway_id: req.gateway_id,
            country_id: req.country_id,
            status: None,
            gateway_txn_id: None,
            idempotency_key: req.idempotency_key.clone(),
            created_at: Utc::now(),
        }
    }

    /// Reconstructs a stored transaction from database fields.
    #[allow(clippy::too_many_arguments)]
    pub fn from_parts(
        id: TransactionId,
        amount: Decimal,
        currency: String,
        kind: TransactionKind,
        user_id: UserId,
        gateway_id: GatewayId,
        country_id: CountryId,
        status: TransactionStatus,
        gateway_txn_id: String,
        idempotency_key: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Some(id),
            amount,
            currency,
            kind,
            user_id,
            gateway_id,
            country_id,
            status: Some(status),
            gateway_txn_id: Some(gateway_txn_id),
            idempotency_key,
            created_at,
        }
    }

    /// Records the gateway's acceptance of the payment.
    pub fn mark_pending(&mut self, gateway_txn_id: impl Into<String>) {
        self.status = Some(TransactionStatus::Pending);
        self.gateway_txn_id = Some(gateway_txn_id.into());
    }

    /// A transaction may only reach the store once a gateway has accepted it.
    pub fn is_settled(&self) -> bool {
        self.status.is_some() && self.gateway_txn_id.as_deref().is_some_and(|id| !id.is_empty())
    }
}
