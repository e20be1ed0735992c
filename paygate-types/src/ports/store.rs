//! Transaction store port.
//!
//! This is the primary port in our hexagonal architecture.
//! Adapters (Postgres, SQLite, InMemory) will implement this trait.

use crate::domain::Transaction;
use crate::error::RepoError;

/// The single source of truth for transaction records.
///
/// `update` must be atomic per row; concurrent updates of the same
/// transaction resolve to the last write.
#[async_trait::async_trait]
pub trait TransactionStore: Send + Sync + 'static {
    /// Persists a settled transaction and returns it with its assigned id.
    ///
    /// Fails with [`RepoError::Conflict`] if the transaction has not been
    /// accepted by a gateway or its gateway reference is already stored.
    async fn create(&self, tx: &Transaction) -> Result<Transaction, RepoError>;

    /// Writes the transaction's mutable fields (status) back, keyed by its
    /// gateway reference.
    async fn update(&self, tx: &Transaction) -> Result<(), RepoError>;

    /// Finds a transaction by the gateway-assigned reference.
    async fn find_by_gateway_txn_id(
        &self,
        gateway_txn_id: &str,
    ) -> Result<Option<Transaction>, RepoError>;
}
