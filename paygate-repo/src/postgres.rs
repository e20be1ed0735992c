//! PostgreSQL repository adapter.

use async_trait::async_trait;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

use paygate_types::ports::DirectoryError;
use paygate_types::{
    CountryId, GatewayDescriptor, GatewayDirectory, RepoError, Transaction, TransactionId,
    TransactionStore,
};

use crate::types::{DbGateway, NewRow, PgTransaction, db_error, insert_error};

const SCHEMA: &str = include_str!("../migrations/postgres/0001_create_tables.sql");
const SEED: &str = include_str!("../migrations/postgres/0002_seed_gateways.sql");

const SELECT_TRANSACTION: &str = r#"SELECT id, amount, currency, type, status, user_id, gateway_id, country_id,
          gateway_txn_id, idempotency_key, created_at
   FROM transactions"#;

/// PostgreSQL repository implementation.
#[derive(Clone)]
pub struct PostgresRepo {
    pool: PgPool,
}

impl PostgresRepo {
    /// Creates a new PostgreSQL repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::raw_sql(SCHEMA).execute(&pool).await?;
        sqlx::raw_sql(SEED).execute(&pool).await?;

        Ok(Self { pool })
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError> {
        let row: Option<PgTransaction> =
            sqlx::query_as(&format!("{SELECT_TRANSACTION} WHERE id = $1"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(PgTransaction::into_domain).transpose()
    }
}

#[async_trait]
impl TransactionStore for PostgresRepo {
    async fn create(&self, tx: &Transaction) -> Result<Transaction, RepoError> {
        let row = NewRow::from_transaction(tx)?;

        let id: i64 = sqlx::query_scalar(
            r#"INSERT INTO transactions
                 (amount, currency, type, status, user_id, gateway_id, country_id,
                  gateway_txn_id, idempotency_key, created_at, updated_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
               RETURNING id"#,
        )
        .bind(tx.amount)
        .bind(&tx.currency)
        .bind(row.kind)
        .bind(row.status)
        .bind(tx.user_id.get())
        .bind(tx.gateway_id.get())
        .bind(tx.country_id.get())
        .bind(row.gateway_txn_id)
        .bind(&tx.idempotency_key)
        .bind(tx.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(insert_error)?;

        let mut stored = tx.clone();
        stored.id = Some(TransactionId::new(id));
        Ok(stored)
    }

    async fn update(&self, tx: &Transaction) -> Result<(), RepoError> {
        let row = NewRow::from_transaction(tx)?;

        let result = sqlx::query(
            r#"UPDATE transactions SET status = $1, updated_at = NOW() WHERE gateway_txn_id = $2"#,
        )
        .bind(row.status)
        .bind(row.gateway_txn_id)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        if result.rows_affected() == 0 {
            return Err(RepoError::NotFound);
        }
        Ok(())
    }

    async fn find_by_gateway_txn_id(
        &self,
        gateway_txn_id: &str,
    ) -> Result<Option<Transaction>, RepoError> {
        let row: Option<PgTransaction> =
            sqlx::query_as(&format!("{SELECT_TRANSACTION} WHERE gateway_txn_id = $1"))
                .bind(gateway_txn_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(PgTransaction::into_domain).transpose()
    }
}

#[async_trait]
impl GatewayDirectory for PostgresRepo {
    async fn list_for_country(
        &self,
        country: CountryId,
    ) -> Result<Vec<GatewayDescriptor>, DirectoryError> {
        let rows: Vec<DbGateway> = sqlx::query_as(
            r#"SELECT g.id, g.name, g.data_formats
               FROM gateways g
               JOIN gateway_countries gc ON g.id = gc.gateway_id
               WHERE gc.country_id = $1
               ORDER BY gc.priority, g.id"#,
        )
        .bind(country.get())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DirectoryError::Unavailable(e.to_string()))?;

        if rows.is_empty() {
            return Err(DirectoryError::NotFound);
        }
        Ok(rows.into_iter().map(DbGateway::into_domain).collect())
    }
}
