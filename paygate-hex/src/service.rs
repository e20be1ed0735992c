//! Payment Application Service
//!
//! Orchestrates deposits, withdrawals and gateway callbacks through the
//! port traits. Contains NO infrastructure logic - pure business orchestration.

use std::sync::Arc;

use paygate_types::{
    AppError, BalanceProvider, ComplianceChecker, PaymentCallback, Transaction, TransactionEvent,
    TransactionRequest, TransactionStatus, TransactionStore, TransitionPolicy,
};

use crate::gateway::GatewaySelector;
use crate::invoker::{RetryPolicy, RetryingInvoker};
use crate::locks::KeyedLocks;
use crate::publisher::EventPublisher;

/// Application service for payment operations.
///
/// Generic over `S: TransactionStore` - the store adapter is injected at
/// compile time. The remaining collaborators are trait objects so the
/// composition root can mix real and simulated adapters freely.
pub struct PaymentService<S: TransactionStore> {
    store: S,
    compliance: Arc<dyn ComplianceChecker>,
    balances: Arc<dyn BalanceProvider>,
    selector: Arc<dyn GatewaySelector>,
    invoker: RetryingInvoker,
    publisher: EventPublisher,
    transitions: TransitionPolicy,
    callback_locks: KeyedLocks,
}

impl<S: TransactionStore> PaymentService<S> {
    pub fn new(
        store: S,
        compliance: Arc<dyn ComplianceChecker>,
        balances: Arc<dyn BalanceProvider>,
        selector: Arc<dyn GatewaySelector>,
        publisher: EventPublisher,
    ) -> Self {
        Self {
            store,
            compliance,
            balances,
            selector,
            invoker: RetryingInvoker::default(),
            publisher,
            transitions: TransitionPolicy::default(),
            callback_locks: KeyedLocks::new(),
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.invoker = RetryingInvoker::new(policy);
        self
    }

    pub fn with_transition_policy(mut self, policy: TransitionPolicy) -> Self {
        self.transitions = policy;
        self
    }

    /// Returns a reference to the underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &EventPublisher {
        &self.publisher
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Deposit / Withdraw
    // ─────────────────────────────────────────────────────────────────────────────

    /// Moves money into the user's account through a gateway.
    ///
    /// Returns the stored transaction in `pending` status.
    #[tracing::instrument(skip(self, req), fields(user_id = %req.user_id, amount = %req.amount))]
    pub async fn deposit(&self, req: TransactionRequest) -> Result<Transaction, AppError> {
        req.validate()?;

        self.compliance
            .check(&req)
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.settle(Transaction::deposit(&req)).await
    }

    /// Moves money out of the user's account through a gateway.
    ///
    /// The balance check runs before compliance and before any gateway call.
    #[tracing::instrument(skip(self, req), fields(user_id = %req.user_id, amount = %req.amount))]
    pub async fn withdraw(&self, req: TransactionRequest) -> Result<Transaction, AppError> {
        req.validate()?;

        let available = self
            .balances
            .balance(req.user_id)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to get account balance: {e}")))?;

        if available < req.amount {
            return Err(AppError::InsufficientFunds {
                available,
                requested: req.amount,
            });
        }

        self.compliance
            .check(&req)
            .await
            .map_err(|e| AppError::Validation(e.to_string()))?;

        self.settle(Transaction::withdraw(&req)).await
    }

    /// Gateway call, then persistence, then a detached event.
    async fn settle(&self, mut tx: Transaction) -> Result<Transaction, AppError> {
        let resolution = self.selector.select(tx.country_id, tx.gateway_id).await;
        if let Some(reason) = resolution.default_reason() {
            tracing::info!(
                gateway = resolution.gateway().name(),
                %reason,
                "Using default gateway"
            );
        }
        let gateway = resolution.into_gateway();

        let receipt = self
            .invoker
            .invoke(gateway.as_ref(), &tx)
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "Gateway retries exhausted");
                AppError::Gateway("Payment gateway error.".into())
            })?;

        tx.mark_pending(receipt.gateway_txn_id);

        // The gateway has already accepted the payment at this point; a failed
        // insert leaves it without an internal record.
        let stored = self.store.create(&tx).await.map_err(|e| {
            tracing::error!(
                error = %e,
                gateway = gateway.name(),
                gateway_txn_id = tx.gateway_txn_id.as_deref().unwrap_or_default(),
                "Gateway accepted payment but the transaction could not be stored"
            );
            AppError::Internal("Failed to save transaction.".into())
        })?;

        self.publisher
            .publish(TransactionEvent::from_transaction(&stored));

        tracing::info!(
            transaction_id = ?stored.id,
            kind = %stored.kind,
            gateway = gateway.name(),
            "Transaction created"
        );
        Ok(stored)
    }

    // ─────────────────────────────────────────────────────────────────────────────
    // Callbacks
    // ─────────────────────────────────────────────────────────────────────────────

    /// Applies a gateway's outcome notification to the stored transaction.
    ///
    /// A callback carrying the status the transaction already has is
    /// acknowledged without touching the store or publishing an event.
    /// Callbacks for the same gateway reference are applied one at a time.
    #[tracing::instrument(skip(self, callback), fields(gateway_txn_id = %callback.gateway_txn_id))]
    pub async fn handle_callback(&self, callback: PaymentCallback) -> Result<(), AppError> {
        callback.validate()?;
        let next: TransactionStatus = callback.status.parse()?;

        let _guard = self.callback_locks.lock(&callback.gateway_txn_id).await;

        let mut tx = self
            .store
            .find_by_gateway_txn_id(&callback.gateway_txn_id)
            .await
            .map_err(|e| AppError::Internal(format!("Failed to fetch transaction: {e}")))?
            .ok_or_else(|| AppError::NotFound("Transaction not found".into()))?;

        let current = tx.status.unwrap_or(TransactionStatus::Pending);
        if current == next {
            tracing::debug!(status = %next, "Duplicate callback ignored");
            return Ok(());
        }

        self.transitions.check(current, next)?;

        if let Some(reason) = callback.error_message.as_deref() {
            tracing::info!(reason, "Gateway reported an error message");
        }

        tx.status = Some(next);
        self.store.update(&tx).await.map_err(|e| {
            tracing::error!(error = %e, "Failed to update transaction");
            AppError::Internal("Failed to update transaction.".into())
        })?;

        self.publisher
            .publish(TransactionEvent::from_transaction(&tx));

        tracing::info!(from = %current, to = %next, "Transaction status updated");
        Ok(())
    }
}
