//! SQLite repository adapter.
#![allow(clippy::collapsible_if)]

use async_trait::async_trait;
use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::str::FromStr;

use paygate_types::ports::DirectoryError;
use paygate_types::{
    CountryId, GatewayDescriptor, GatewayDirectory, RepoError, Transaction, TransactionId,
    TransactionStore,
};

use crate::types::{DbGateway, DbTransaction, NewRow, db_error, insert_error};

const SCHEMA: &str = include_str!("../migrations/sqlite/0001_create_tables.sql");
const SEED: &str = include_str!("../migrations/sqlite/0002_seed_gateways.sql");

const SELECT_TRANSACTION: &str = r#"SELECT id, amount, currency, type, status, user_id, gateway_id, country_id,
          gateway_txn_id, idempotency_key, created_at
   FROM transactions"#;

// ─────────────────────────────────────────────────────────────────────────────
// SQLite Repository
// ─────────────────────────────────────────────────────────────────────────────

/// SQLite repository implementation.
#[derive(Clone)]
pub struct SqliteRepo {
    pool: SqlitePool,
}

impl SqliteRepo {
    /// Creates a new SQLite repository with automatic migration.
    pub async fn new(database_url: &str) -> anyhow::Result<Self> {
        // Ensure on-disk SQLite target directory exists (no-op for in-memory).
        if let Some(path) = database_url.strip_prefix("sqlite://") {
            let path = path.split('?').next().unwrap_or(path);
            if path != ":memory:" {
                let p = std::path::Path::new(path);
                if let Some(parent) = p.parent() {
                    if !parent.as_os_str().is_empty() {
                        tokio::fs::create_dir_all(parent).await?;
                    }
                }
            }
        }

        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        let mut pool_options = SqlitePoolOptions::new();
        if database_url.contains(":memory:") {
            // Each connection to an in-memory database sees its own empty database.
            pool_options = pool_options
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None);
        }
        let pool = pool_options.connect_with(options).await?;

        let repo = Self { pool };
        repo.create_schema().await?;
        Ok(repo)
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Creates the tables and installs the default gateways.
    pub async fn create_schema(&self) -> Result<(), RepoError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        sqlx::raw_sql(SEED)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    /// Registers `gateway` for `country` at the given preference (lower first).
    pub async fn add_gateway(
        &self,
        country: CountryId,
        gateway: &GatewayDescriptor,
        priority: i32,
    ) -> Result<(), RepoError> {
        sqlx::query(
            r#"INSERT INTO gateways (id, name, data_formats) VALUES (?, ?, ?)
               ON CONFLICT (id) DO UPDATE SET name = excluded.name, data_formats = excluded.data_formats"#,
        )
        .bind(gateway.id.get())
        .bind(&gateway.name)
        .bind(gateway.data_formats.join(","))
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        sqlx::query(
            r#"INSERT INTO gateway_countries (gateway_id, country_id, priority) VALUES (?, ?, ?)
               ON CONFLICT (gateway_id, country_id) DO UPDATE SET priority = excluded.priority"#,
        )
        .bind(gateway.id.get())
        .bind(country.get())
        .bind(priority)
        .execute(&self.pool)
        .await
        .map_err(db_error)?;

        Ok(())
    }

    pub async fn get_transaction(&self, id: TransactionId) -> Result<Option<Transaction>, RepoError> {
        let row: Option<DbTransaction> =
            sqlx::query_as(&format!("{SELECT_TRANSACTION} WHERE id = ?"))
                .bind(id.get())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(DbTransaction::into_domain).transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Store implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl TransactionStore for SqliteRepo {
    async fn create(&self, tx: &Transaction) -> Result<Transaction, RepoError> {
        let row = NewRow::from_transaction(tx)?;
        let now = chrono::Utc::now().to_rfc3339();

        let result = sqlx::query(
            r#"INSERT INTO transactions
                 (amount, currency, type, status, user_id, gateway_id, country_id,
                  gateway_txn_id, idempotency_key, created_at, updated_at)
               VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(tx.amount.to_string())
        .bind(&tx.currency)
        .bind(row.kind)
        .bind(row.status)
        .bind(tx.user_id.get())
        .bind(tx.gateway_id.get())
        .bind(tx.country_id.get())
        .bind(row.gateway_txn_id)
        .bind(&tx.idempotency_key)
        .bind(tx.created_at.to_rfc3339())
        .bind(&now)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        let mut stored = tx.clone();
        stored.id = Some(TransactionId::new(result.last_insert_rowid()));
        Ok(stored)
    }

    async fn update(&self, tx: &Transaction) -> Result<(), RepoError> {
        let row = NewRow::from_transaction(tx)?;

        let result = sqlx::query(
            r#"UPDATE transactions SET status = ?, updated_at = ? WHERE gateway_txn_id = ?"#,
        )
        .bind(row.status)
        .bind(chrono::Utc::now().to_rfc3339())
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
        let row: Option<DbTransaction> =
            sqlx::query_as(&format!("{SELECT_TRANSACTION} WHERE gateway_txn_id = ?"))
                .bind(gateway_txn_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(db_error)?;

        row.map(DbTransaction::into_domain).transpose()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Directory implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait]
impl GatewayDirectory for SqliteRepo {
    async fn list_for_country(
        &self,
        country: CountryId,
    ) -> Result<Vec<GatewayDescriptor>, DirectoryError> {
        let rows: Vec<DbGateway> = sqlx::query_as(
            r#"SELECT g.id, g.name, g.data_formats
               FROM gateways g
               JOIN gateway_countries gc ON g.id = gc.gateway_id
               WHERE gc.country_id = ?
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
