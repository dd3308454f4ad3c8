//! Transaction handle and options

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::postgres::{PgQueryResult, PgRow};
use sqlx::{FromRow, Postgres, Transaction};
use tokio::sync::Mutex;
use tokio::time::Instant;

use super::error::DbError;
use super::executor::{fetch_exactly_one, Executor, PgQuery, PgQueryAs, TxHandle};

/// Transaction isolation level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    ReadUncommitted,
    ReadCommitted,
    RepeatableRead,
    Serializable,
}

impl IsolationLevel {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadUncommitted => "READ UNCOMMITTED",
            Self::ReadCommitted => "READ COMMITTED",
            Self::RepeatableRead => "REPEATABLE READ",
            Self::Serializable => "SERIALIZABLE",
        }
    }
}

/// Transaction access mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    ReadWrite,
    ReadOnly,
}

impl AccessMode {
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::ReadWrite => "READ WRITE",
            Self::ReadOnly => "READ ONLY",
        }
    }
}

/// How a unit of work should run.
///
/// The default leaves isolation and access mode to the server and sets no
/// deadline.
#[derive(Debug, Clone, Default)]
pub struct TxOptions {
    pub isolation: Option<IsolationLevel>,
    pub access_mode: Option<AccessMode>,
    pub deferrable: bool,
    /// Covers begin and the callback. Commit and rollback always run to
    /// completion.
    pub deadline: Option<Instant>,
}

impl TxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn isolation(mut self, level: IsolationLevel) -> Self {
        self.isolation = Some(level);
        self
    }

    pub fn access_mode(mut self, mode: AccessMode) -> Self {
        self.access_mode = Some(mode);
        self
    }

    pub fn read_only(self) -> Self {
        self.access_mode(AccessMode::ReadOnly)
    }

    pub fn deferrable(mut self) -> Self {
        self.deferrable = true;
        self
    }

    pub fn deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Deadline relative to now.
    pub fn timeout(self, timeout: Duration) -> Self {
        self.deadline(Instant::now() + timeout)
    }

    /// `SET TRANSACTION` statement for the non-default modes, if any.
    pub fn set_transaction_sql(&self) -> Option<String> {
        let mut modes = Vec::new();

        if let Some(level) = self.isolation {
            modes.push(format!("ISOLATION LEVEL {}", level.as_sql()));
        }
        if let Some(mode) = self.access_mode {
            modes.push(mode.as_sql().to_owned());
        }
        if self.deferrable {
            modes.push("DEFERRABLE".to_owned());
        }

        if modes.is_empty() {
            None
        } else {
            Some(format!("SET TRANSACTION {}", modes.join(", ")))
        }
    }
}

/// Handle to one in-flight transaction on one leased connection.
///
/// Clones share the same transaction. Statements are serialized through an
/// async mutex, so they reach the server in the order they were issued.
/// Once committed or rolled back, every call returns
/// [`DbError::TransactionFinished`]; the leased connection is already back
/// in the pool by then.
#[derive(Clone)]
pub struct PgTransaction {
    inner: Arc<Mutex<Option<Transaction<'static, Postgres>>>>,
}

impl PgTransaction {
    pub(crate) fn new(tx: Transaction<'static, Postgres>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(Some(tx))),
        }
    }

    async fn take(&self) -> Result<Transaction<'static, Postgres>, DbError> {
        self.inner
            .lock()
            .await
            .take()
            .ok_or(DbError::TransactionFinished)
    }
}

impl std::fmt::Debug for PgTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PgTransaction").finish_non_exhaustive()
    }
}

#[async_trait]
impl Executor for PgTransaction {
    async fn get<'q, T>(&self, query: PgQueryAs<'q, T>) -> Result<T, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut guard = self.inner.lock().await;
        let tx = Option::as_mut(&mut *guard).ok_or(DbError::TransactionFinished)?;
        fetch_exactly_one(query.fetch(&mut **tx)).await
    }

    async fn select<'q, T>(&self, query: PgQueryAs<'q, T>) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
    {
        let mut guard = self.inner.lock().await;
        let tx = Option::as_mut(&mut *guard).ok_or(DbError::TransactionFinished)?;
        Ok(query.fetch_all(&mut **tx).await?)
    }

    async fn query_row<'q>(&self, query: PgQuery<'q>) -> Result<PgRow, DbError> {
        let mut guard = self.inner.lock().await;
        let tx = Option::as_mut(&mut *guard).ok_or(DbError::TransactionFinished)?;
        Ok(query
            .fetch_optional(&mut **tx)
            .await?
            .ok_or(sqlx::Error::RowNotFound)?)
    }

    async fn query<'q>(&self, query: PgQuery<'q>) -> Result<Vec<PgRow>, DbError> {
        let mut guard = self.inner.lock().await;
        let tx = Option::as_mut(&mut *guard).ok_or(DbError::TransactionFinished)?;
        Ok(query.fetch_all(&mut **tx).await?)
    }

    async fn exec<'q>(&self, query: PgQuery<'q>) -> Result<PgQueryResult, DbError> {
        let mut guard = self.inner.lock().await;
        let tx = Option::as_mut(&mut *guard).ok_or(DbError::TransactionFinished)?;
        Ok(query.execute(&mut **tx).await?)
    }
}

#[async_trait]
impl TxHandle for PgTransaction {
    async fn commit(&self) -> Result<(), DbError> {
        let tx = self.take().await?;
        tx.commit().await?;
        tracing::debug!("transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> Result<(), DbError> {
        let tx = self.take().await?;
        tx.rollback().await?;
        tracing::debug!("transaction rolled back");
        Ok(())
    }
}
