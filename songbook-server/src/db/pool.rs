//! Database connection pool management
//!
//! [`PgDatabase`] is the long-lived pool handle: created once at startup,
//! closed once at shutdown. It is the only [`Transactor`] in the crate.

use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgQueryResult, PgRow};
use sqlx::{FromRow, PgPool};

use super::error::DbError;
use super::executor::{fetch_exactly_one, Executor, PgQuery, PgQueryAs, Transactor};
use super::transaction::{PgTransaction, TxOptions};
use crate::config::{ConfigError, DatabaseConfig};

/// Error while building the pool at startup. Fatal to the process.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("failed to connect to database: {0}")]
    Connect(#[from] DbError),
}

/// Create a PostgreSQL connection pool from discrete settings.
///
/// # Errors
///
/// Returns an error if the settings are invalid or the connection fails.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, ConnectError> {
    let options = config.connect_options()?;

    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(config.acquire_timeout)
        .connect_with(options)
        .await
        .map_err(|e| ConnectError::Connect(e.into()))
}

/// Pool-backed handle.
#[derive(Clone, Debug)]
pub struct PgDatabase {
    pool: PgPool,
}

impl PgDatabase {
    /// Build the pool and verify connectivity with a ping.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let db = PgDatabase::connect(&DatabaseConfig::from_env()?).await?;
    /// ```
    pub async fn connect(config: &DatabaseConfig) -> Result<Self, ConnectError> {
        let db = Self::from_pool(create_pool(config).await?);
        db.ping().await?;

        tracing::info!(url = %config.redacted_url(), "connected to PostgreSQL");
        Ok(db)
    }

    /// Wrap an existing pool.
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        self.exec(sqlx::query("SELECT 1")).await?;
        Ok(())
    }
}

#[async_trait]
impl Executor for PgDatabase {
    async fn get<'q, T>(&self, query: PgQueryAs<'q, T>) -> Result<T, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        fetch_exactly_one(query.fetch(&self.pool)).await
    }

    async fn select<'q, T>(&self, query: PgQueryAs<'q, T>) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn query_row<'q>(&self, query: PgQuery<'q>) -> Result<PgRow, DbError> {
        Ok(query
            .fetch_optional(&self.pool)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?)
    }

    async fn query<'q>(&self, query: PgQuery<'q>) -> Result<Vec<PgRow>, DbError> {
        Ok(query.fetch_all(&self.pool).await?)
    }

    async fn exec<'q>(&self, query: PgQuery<'q>) -> Result<PgQueryResult, DbError> {
        Ok(query.execute(&self.pool).await?)
    }
}

#[async_trait]
impl Transactor for PgDatabase {
    type Tx = PgTransaction;

    async fn begin(&self, options: &TxOptions) -> Result<PgTransaction, DbError> {
        // Leases a connection and issues BEGIN on it
        let mut tx = self.pool.begin().await?;

        if let Some(sql) = options.set_transaction_sql() {
            let applied = sqlx::query(&sql).execute(&mut *tx).await;
            if let Err(err) = applied {
                tracing::error!(error = %err, "failed to apply transaction options");
                if let Err(release_err) = tx.rollback().await {
                    tracing::warn!(error = %release_err, "rollback after failed begin also failed");
                }
                return Err(err.into());
            }
        }

        tracing::debug!(?options, "transaction started");
        Ok(PgTransaction::new(tx))
    }

    async fn close(&self) {
        self.pool.close().await;
        tracing::info!("database pool closed");
    }
}
