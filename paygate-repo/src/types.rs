//! Shared database row types for SQLite and PostgreSQL.
//!
//! SQLite keeps amounts and timestamps as text; PostgreSQL uses `NUMERIC`
//! and `TIMESTAMPTZ`. Each backend gets its own row struct.

use sqlx::FromRow;

use paygate_types::{
    CountryId, GatewayDescriptor, GatewayId, RepoError, Transaction, TransactionId,
    TransactionKind, TransactionStatus, UserId,
};

// ─────────────────────────────────────────────────────────────────────────────
// Database row structs (derive FromRow for automatic mapping)
// ─────────────────────────────────────────────────────────────────────────────

/// Transaction row from SQLite.
#[cfg(feature = "sqlite")]
#[derive(FromRow)]
pub struct DbTransaction {
    pub id: i64,
    pub amount: String,
    pub currency: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: String,
    pub user_id: i64,
    pub gateway_id: i64,
    pub country_id: i64,
    pub gateway_txn_id: String,
    pub idempotency_key: Option<String>,
    pub created_at: String,
}

/// Transaction row from PostgreSQL.
#[cfg(feature = "postgres")]
#[derive(FromRow)]
pub struct PgTransaction {
    pub id: i64,
    pub amount: rust_decimal::Decimal,
    pub currency: String,
    #[sqlx(rename = "type")]
    pub kind: String,
    pub status: String,
    pub user_id: i64,
    pub gateway_id: i64,
    pub country_id: i64,
    pub gateway_txn_id: String,
    pub idempotency_key: Option<String>,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// Gateway row joined with its country priority.
#[derive(FromRow)]
pub struct DbGateway {
    pub id: i64,
    pub name: String,
    pub data_formats: String,
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing helpers
// ─────────────────────────────────────────────────────────────────────────────

pub fn parse_kind(s: &str) -> Result<TransactionKind, RepoError> {
    s.parse().map_err(RepoError::Domain)
}

pub fn parse_status(s: &str) -> Result<TransactionStatus, RepoError> {
    s.parse().map_err(RepoError::Domain)
}

pub fn db_error(e: impl std::fmt::Display) -> RepoError {
    RepoError::Database(e.to_string())
}

/// Inserts with a duplicate gateway reference surface as conflicts.
pub fn insert_error(e: sqlx::Error) -> RepoError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            RepoError::Conflict("gateway transaction id already recorded".into())
        }
        _ => db_error(e),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Domain conversion
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(feature = "sqlite")]
impl DbTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        let amount: rust_decimal::Decimal = self.amount.parse().map_err(db_error)?;
        let created_at = chrono::DateTime::parse_from_rfc3339(&self.created_at)
            .map_err(db_error)?
            .with_timezone(&chrono::Utc);

        Ok(Transaction::from_parts(
            TransactionId::new(self.id),
            amount,
            self.currency,
            parse_kind(&self.kind)?,
            UserId::new(self.user_id),
            GatewayId::new(self.gateway_id),
            CountryId::new(self.country_id),
            parse_status(&self.status)?,
            self.gateway_txn_id,
            self.idempotency_key,
            created_at,
        ))
    }
}

#[cfg(feature = "postgres")]
impl PgTransaction {
    /// Convert database row to domain Transaction.
    pub fn into_domain(self) -> Result<Transaction, RepoError> {
        Ok(Transaction::from_parts(
            TransactionId::new(self.id),
            self.amount,
            self.currency,
            parse_kind(&self.kind)?,
            UserId::new(self.user_id),
            GatewayId::new(self.gateway_id),
            CountryId::new(self.country_id),
            parse_status(&self.status)?,
            self.gateway_txn_id,
            self.idempotency_key,
            self.created_at,
        ))
    }
}

impl DbGateway {
    pub fn into_domain(self) -> GatewayDescriptor {
        GatewayDescriptor::new(self.id, self.name).with_formats(
            self.data_formats
                .split(',')
                .map(str::trim)
                .filter(|f| !f.is_empty()),
        )
    }
}

/// Fields written by `create`, extracted once for both backends.
pub struct NewRow<'a> {
    pub kind: &'static str,
    pub status: &'static str,
    pub gateway_txn_id: &'a str,
}

impl<'a> NewRow<'a> {
    pub fn from_transaction(tx: &'a Transaction) -> Result<Self, RepoError> {
        match (tx.status, tx.gateway_txn_id.as_deref()) {
            (Some(status), Some(gateway_txn_id)) if tx.is_settled() => Ok(Self {
                kind: tx.kind.as_str(),
                status: status.as_str(),
                gateway_txn_id,
            }),
            _ => Err(RepoError::Conflict(
                "transaction has not been accepted by a gateway".into(),
            )),
        }
    }
}
