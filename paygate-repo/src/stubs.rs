//! Placeholder compliance and balance collaborators for the server binary.

use async_trait::async_trait;
use rust_decimal::Decimal;

use paygate_types::ports::{BalanceError, ComplianceError};
use paygate_types::{BalanceProvider, ComplianceChecker, TransactionRequest, UserId};

/// Approves every request.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAllCompliance;

#[async_trait]
impl ComplianceChecker for ApproveAllCompliance {
    async fn check(&self, _req: &TransactionRequest) -> Result<String, ComplianceError> {
        Ok("approved".to_string())
    }
}

/// Reports the same balance for every user.
#[derive(Debug, Clone, Copy)]
pub struct FixedBalance {
    amount: Decimal,
}

impl FixedBalance {
    pub fn new(amount: Decimal) -> Self {
        Self { amount }
    }
}

#[async_trait]
impl BalanceProvider for FixedBalance {
    async fn balance(&self, _user_id: UserId) -> Result<Decimal, BalanceError> {
        Ok(self.amount)
    }
}
