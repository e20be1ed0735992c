//! In-memory store and gateway directory.
//!
//! Used when no database is configured and in tests. Clones share state.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use paygate_types::ports::DirectoryError;
use paygate_types::{
    CountryId, GatewayDescriptor, GatewayDirectory, RepoError, Transaction, TransactionId,
    TransactionStore,
};

// ─────────────────────────────────────────────────────────────────────────────
// Transactions
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

#[derive(Default)]
struct MemoryInner {
    /// Keyed by gateway transaction id
    transactions: DashMap<String, Transaction>,
    next_id: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, id: TransactionId) -> Option<Transaction> {
        self.inner
            .transactions
            .iter()
            .find(|entry| entry.id == Some(id))
            .map(|entry| entry.value().clone())
    }

    pub fn len(&self) -> usize {
        self.inner.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.transactions.is_empty()
    }
}

#[async_trait]
impl TransactionStore for MemoryStore {
    async fn create(&self, tx: &Transaction) -> Result<Transaction, RepoError> {
        let key = match tx.gateway_txn_id.as_deref() {
            Some(key) if tx.is_settled() => key.to_string(),
            _ => {
                return Err(RepoError::Conflict(
                    "transaction has not been accepted by a gateway".into(),
                ));
            }
        };

        match self.inner.transactions.entry(key) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(RepoError::Conflict(
                "gateway transaction id already recorded".into(),
            )),
            dashmap::mapref::entry::Entry::Vacant(slot) => {
                let mut stored = tx.clone();
                let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
                stored.id = Some(TransactionId::new(id));
                slot.insert(stored.clone());
                Ok(stored)
            }
        }
    }

    async fn update(&self, tx: &Transaction) -> Result<(), RepoError> {
        let key = tx.gateway_txn_id.as_deref().ok_or(RepoError::NotFound)?;
        let mut row = self
            .inner
            .transactions
            .get_mut(key)
            .ok_or(RepoError::NotFound)?;
        row.status = tx.status;
        Ok(())
    }

    async fn find_by_gateway_txn_id(
        &self,
        gateway_txn_id: &str,
    ) -> Result<Option<Transaction>, RepoError> {
        Ok(self
            .inner
            .transactions
            .get(gateway_txn_id)
            .map(|row| row.value().clone()))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Gateway directory
// ─────────────────────────────────────────────────────────────────────────────

/// Country → gateways mapping, kept in insertion (preference) order.
#[derive(Clone, Default)]
pub struct MemoryDirectory {
    countries: Arc<DashMap<CountryId, Vec<GatewayDescriptor>>>,
}

impl MemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Same gateways the SQL seed migration installs.
    pub fn seeded() -> Self {
        Self::new()
            .with_gateway(CountryId::new(840), stripe())
            .with_gateway(
                CountryId::new(840),
                GatewayDescriptor::new(200, "paypal").with_formats(["json", "xml"]),
            )
            .with_gateway(CountryId::new(826), stripe())
            .with_gateway(
                CountryId::new(276),
                GatewayDescriptor::new(200, "paypal").with_formats(["json", "xml"]),
            )
    }

    pub fn with_gateway(self, country: CountryId, gateway: GatewayDescriptor) -> Self {
        self.countries.entry(country).or_default().push(gateway);
        self
    }
}

fn stripe() -> GatewayDescriptor {
    GatewayDescriptor::new(112, "stripe").with_formats(["json"])
}

#[async_trait]
impl GatewayDirectory for MemoryDirectory {
    async fn list_for_country(
        &self,
        country: CountryId,
    ) -> Result<Vec<GatewayDescriptor>, DirectoryError> {
        match self.countries.get(&country) {
            Some(list) if !list.is_empty() => Ok(list.value().clone()),
            _ => Err(DirectoryError::NotFound),
        }
    }
}
