//! Query execution capabilities
//!
//! Two capability levels, fixed by type rather than probed at runtime:
//!
//! - [`Executor`]: parameterized reads and writes. Implemented by the pool
//!   handle and by transaction handles alike, so repositories never care
//!   which one they were given.
//! - [`Transactor`]: an [`Executor`] that can also begin transactions and be
//!   closed. Only the pool handle implements it. A transaction handle is a
//!   [`TxHandle`] instead, which adds the terminal `commit`/`rollback` but
//!   cannot begin another transaction.
//!
//! Statements are ordinary sqlx builders:
//!
//! ```ignore
//! let row: (i32,) = executor
//!     .get(sqlx::query_as("SELECT id FROM songs WHERE title = $1").bind(title))
//!     .await?;
//! ```

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::TryStreamExt;
use sqlx::postgres::{PgArguments, PgQueryResult, PgRow};
use sqlx::query::{Query, QueryAs};
use sqlx::{FromRow, Postgres};

use super::error::DbError;
use super::transaction::TxOptions;

/// Raw statement with bound arguments.
pub type PgQuery<'q> = Query<'q, Postgres, PgArguments>;

/// Statement whose rows map onto `T`.
pub type PgQueryAs<'q, T> = QueryAs<'q, Postgres, T, PgArguments>;

/// Read/write operations shared by every handle.
///
/// One round-trip per call. No retries, no caching. Errors come back
/// unclassified.
#[async_trait]
pub trait Executor: Clone + Send + Sync + 'static {
    /// Fetch exactly one row into `T`.
    ///
    /// Zero rows yields the `RowNotFound` sentinel, more than one yields
    /// [`DbError::TooManyRows`].
    async fn get<'q, T>(&self, query: PgQueryAs<'q, T>) -> Result<T, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    /// Fetch every matching row into `T`. Zero rows is an empty vec.
    async fn select<'q, T>(&self, query: PgQueryAs<'q, T>) -> Result<Vec<T>, DbError>
    where
        T: for<'r> FromRow<'r, PgRow> + Send + Unpin;

    /// Fetch a single raw row.
    async fn query_row<'q>(&self, query: PgQuery<'q>) -> Result<PgRow, DbError>;

    /// Fetch all raw rows.
    async fn query<'q>(&self, query: PgQuery<'q>) -> Result<Vec<PgRow>, DbError>;

    /// Run a statement that returns no rows.
    async fn exec<'q>(&self, query: PgQuery<'q>) -> Result<PgQueryResult, DbError>;
}

/// A handle that can start transactions.
#[async_trait]
pub trait Transactor: Executor {
    /// Handle type produced by [`Transactor::begin`].
    type Tx: TxHandle;

    /// Lease a connection and start a transaction on it.
    async fn begin(&self, options: &TxOptions) -> Result<Self::Tx, DbError>;

    /// Shut the handle down. Call once, at process exit.
    async fn close(&self);
}

/// An in-flight transaction.
///
/// Exactly one of `commit`/`rollback` should be called, once. The unit of
/// work in [`crate::store::DataStore`] is the only caller in this crate.
#[async_trait]
pub trait TxHandle: Executor {
    async fn commit(&self) -> Result<(), DbError>;

    async fn rollback(&self) -> Result<(), DbError>;
}

/// Drain at most two rows from `rows`, insisting on exactly one.
pub(crate) async fn fetch_exactly_one<T>(
    mut rows: BoxStream<'_, Result<T, sqlx::Error>>,
) -> Result<T, DbError> {
    let first = rows.try_next().await?.ok_or(sqlx::Error::RowNotFound)?;

    if rows.try_next().await?.is_some() {
        return Err(DbError::TooManyRows);
    }

    Ok(first)
}
