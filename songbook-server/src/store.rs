//! Repository registry and unit of work
//!
//! A [`DataStore`] binds repositories to one executor. Bound to the pool it
//! serves plain reads; [`DataStore::with_transaction`] hands the callback a
//! second, transaction-scoped `DataStore` whose repositories all join the
//! same transaction.
//!
//! Only a `DataStore` over a [`Transactor`] can open a transaction, and a
//! transaction handle is not one. Nesting is rejected by the compiler:
//!
//! ```compile_fail
//! use songbook_server::db::PgDatabase;
//! use songbook_server::error::AppResult;
//! use songbook_server::store::DataStore;
//!
//! async fn nested(store: DataStore<PgDatabase>) -> AppResult<()> {
//!     store
//!         .with_transaction(|tx| async move {
//!             tx.with_transaction(|inner| async move { Ok(()) }).await
//!         })
//!         .await
//! }
//! ```
//!
//! The supported shape:
//!
//! ```no_run
//! use songbook_server::db::PgDatabase;
//! use songbook_server::error::AppResult;
//! use songbook_server::models::NewSong;
//! use songbook_server::store::DataStore;
//!
//! async fn add(store: &DataStore<PgDatabase>, song: NewSong) -> AppResult<i32> {
//!     store
//!         .with_transaction(|tx| async move {
//!             let songs = tx.song_repo();
//!             songs.add_song(&song).await
//!         })
//!         .await
//! }
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::db::{deadline, Executor, SongRepository, Transactor, TxHandle, TxOptions};
use crate::error::{AppError, AppResult};

/// Lazily built repositories over one executor.
///
/// Clones share the executor and the cache. A fresh [`DataStore::new`] starts
/// with an empty cache.
pub struct DataStore<E> {
    inner: Arc<Inner<E>>,
}

struct Inner<E> {
    executor: E,
    songs: OnceCell<Arc<SongRepository<E>>>,
}

impl<E> Clone for DataStore<E> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<E> fmt::Debug for DataStore<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DataStore")
            .field("songs_built", &self.inner.songs.get().is_some())
            .finish_non_exhaustive()
    }
}

impl<E: Executor> DataStore<E> {
    pub fn new(executor: E) -> Self {
        Self {
            inner: Arc::new(Inner {
                executor,
                songs: OnceCell::new(),
            }),
        }
    }

    /// The handle every repository here is bound to.
    pub fn executor(&self) -> &E {
        &self.inner.executor
    }

    /// Song repository, built on first use. Concurrent first callers all get
    /// the same instance.
    pub fn song_repo(&self) -> Arc<SongRepository<E>> {
        let repo = self
            .inner
            .songs
            .get_or_init(|| Arc::new(SongRepository::new(self.inner.executor.clone())));
        Arc::clone(repo)
    }
}

impl<D: Transactor> DataStore<D> {
    /// Run `f` as one unit of work with default options.
    ///
    /// See [`DataStore::with_transaction_opts`].
    pub async fn with_transaction<F, Fut, T>(&self, f: F) -> AppResult<T>
    where
        F: FnOnce(DataStore<D::Tx>) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        self.with_transaction_opts(TxOptions::default(), f).await
    }

    /// Run `f` inside a transaction.
    ///
    /// - begin fails: the classified error is returned and `f` never runs
    /// - `f` fails: rolled back once, `f`'s error is returned unchanged even
    ///   if the rollback fails (that failure is only logged)
    /// - `f` succeeds: committed once, a commit failure is classified
    ///
    /// The deadline in `options` covers begin and `f`. When it fires the
    /// transaction is rolled back and the result is a request timeout.
    pub async fn with_transaction_opts<F, Fut, T>(&self, options: TxOptions, f: F) -> AppResult<T>
    where
        F: FnOnce(DataStore<D::Tx>) -> Fut,
        Fut: Future<Output = AppResult<T>>,
    {
        let tx = deadline::within(options.deadline, self.inner.executor.begin(&options))
            .await
            .and_then(|begun| begun)
            .map_err(|err| {
                tracing::error!(error = %err, "failed to begin transaction");
                AppError::from(err)
            })?;

        let scoped = DataStore::new(tx.clone());
        let outcome = match deadline::within(options.deadline, f(scoped)).await {
            Ok(result) => result,
            Err(err) => Err(AppError::from(err)),
        };

        match outcome {
            Ok(value) => {
                tx.commit().await.map_err(|err| {
                    tracing::error!(error = %err, "commit failed");
                    AppError::from(err)
                })?;
                Ok(value)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    tracing::error!(
                        error = %rollback_err,
                        cause = %err,
                        "rollback failed, returning the original error"
                    );
                }
                Err(err)
            }
        }
    }

    /// Close the underlying handle. Call once at shutdown.
    pub async fn close(&self) {
        self.inner.executor.close().await;
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory stand-ins for the pool and transaction handles.

    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use sqlx::postgres::{PgQueryResult, PgRow};
    use sqlx::FromRow;

    use crate::db::{DbError, Executor, PgQuery, PgQueryAs, Transactor, TxHandle, TxOptions};

    /// Shared counters and failure switches.
    #[derive(Debug, Default)]
    pub struct Tally {
        pub begins: AtomicUsize,
        pub commits: AtomicUsize,
        pub rollbacks: AtomicUsize,
        pub pool_statements: AtomicUsize,
        pub tx_statements: AtomicUsize,
        pub fail_begin: AtomicBool,
        pub fail_commit: AtomicBool,
        pub fail_rollback: AtomicBool,
        /// Transaction statements fail with SQLSTATE 23505.
        pub unique_violation: AtomicBool,
        /// Pool statements hang for an hour before answering.
        pub stall_pool: AtomicBool,
    }

    impl Tally {
        pub fn count(counter: &AtomicUsize) -> usize {
            counter.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug, Clone, Default)]
    pub struct FakePool {
        pub tally: Arc<Tally>,
    }

    #[derive(Debug, Clone)]
    pub struct FakeTx {
        tally: Arc<Tally>,
        finished: Arc<AtomicBool>,
    }

    fn no_rows<T>() -> Result<T, DbError> {
        Err(DbError::Sqlx(sqlx::Error::RowNotFound))
    }

    /// Server-reported error with an optional SQLSTATE.
    #[derive(Debug)]
    pub struct FakeDbError {
        code: Option<&'static str>,
        message: &'static str,
    }

    impl fmt::Display for FakeDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            match self.code {
                Some(code) => write!(f, "{} (SQLSTATE {})", self.message, code),
                None => f.write_str(self.message),
            }
        }
    }

    impl StdError for FakeDbError {}

    impl sqlx::error::DatabaseError for FakeDbError {
        fn message(&self) -> &str {
            self.message
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> sqlx::error::ErrorKind {
            sqlx::error::ErrorKind::Other
        }
    }

    pub fn db_error(code: Option<&'static str>, message: &'static str) -> DbError {
        DbError::Sqlx(sqlx::Error::Database(Box::new(FakeDbError { code, message })))
    }

    impl FakePool {
        async fn statement(&self) {
            self.tally.pool_statements.fetch_add(1, Ordering::SeqCst);
            if self.tally.stall_pool.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
        }
    }

    #[async_trait]
    impl Executor for FakePool {
        async fn get<'q, T>(&self, _query: PgQueryAs<'q, T>) -> Result<T, DbError>
        where
            T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        {
            self.statement().await;
            no_rows()
        }

        async fn select<'q, T>(&self, _query: PgQueryAs<'q, T>) -> Result<Vec<T>, DbError>
        where
            T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        {
            self.statement().await;
            Ok(Vec::new())
        }

        async fn query_row<'q>(&self, _query: PgQuery<'q>) -> Result<PgRow, DbError> {
            self.statement().await;
            no_rows()
        }

        async fn query<'q>(&self, _query: PgQuery<'q>) -> Result<Vec<PgRow>, DbError> {
            self.statement().await;
            Ok(Vec::new())
        }

        async fn exec<'q>(&self, _query: PgQuery<'q>) -> Result<PgQueryResult, DbError> {
            self.statement().await;
            Ok(PgQueryResult::default())
        }
    }

    impl FakeTx {
        fn statement(&self) -> Result<(), DbError> {
            if self.finished.load(Ordering::SeqCst) {
                return Err(DbError::TransactionFinished);
            }
            self.tally.tx_statements.fetch_add(1, Ordering::SeqCst);
            if self.tally.unique_violation.load(Ordering::SeqCst) {
                return Err(db_error(
                    Some("23505"),
                    "duplicate key value violates unique constraint \"songs_group_name_title_key\"",
                ));
            }
            Ok(())
        }

        fn finish(&self) -> Result<(), DbError> {
            if self.finished.swap(true, Ordering::SeqCst) {
                return Err(DbError::TransactionFinished);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl Executor for FakeTx {
        async fn get<'q, T>(&self, _query: PgQueryAs<'q, T>) -> Result<T, DbError>
        where
            T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        {
            self.statement()?;
            no_rows()
        }

        async fn select<'q, T>(&self, _query: PgQueryAs<'q, T>) -> Result<Vec<T>, DbError>
        where
            T: for<'r> FromRow<'r, PgRow> + Send + Unpin,
        {
            self.statement()?;
            Ok(Vec::new())
        }

        async fn query_row<'q>(&self, _query: PgQuery<'q>) -> Result<PgRow, DbError> {
            self.statement()?;
            no_rows()
        }

        async fn query<'q>(&self, _query: PgQuery<'q>) -> Result<Vec<PgRow>, DbError> {
            self.statement()?;
            Ok(Vec::new())
        }

        async fn exec<'q>(&self, _query: PgQuery<'q>) -> Result<PgQueryResult, DbError> {
            self.statement()?;
            Ok(PgQueryResult::default())
        }
    }

    #[async_trait]
    impl Transactor for FakePool {
        type Tx = FakeTx;

        async fn begin(&self, _options: &TxOptions) -> Result<FakeTx, DbError> {
            self.tally.begins.fetch_add(1, Ordering::SeqCst);
            if self.tally.fail_begin.load(Ordering::SeqCst) {
                return Err(DbError::Sqlx(sqlx::Error::PoolClosed));
            }
            Ok(FakeTx {
                tally: Arc::clone(&self.tally),
                finished: Arc::new(AtomicBool::new(false)),
            })
        }

        async fn close(&self) {}
    }

    #[async_trait]
    impl TxHandle for FakeTx {
        async fn commit(&self) -> Result<(), DbError> {
            self.finish()?;
            self.tally.commits.fetch_add(1, Ordering::SeqCst);
            if self.tally.fail_commit.load(Ordering::SeqCst) {
                return Err(DbError::Sqlx(sqlx::Error::Protocol("connection lost".into())));
            }
            Ok(())
        }

        async fn rollback(&self) -> Result<(), DbError> {
            self.finish()?;
            self.tally.rollbacks.fetch_add(1, Ordering::SeqCst);
            if self.tally.fail_rollback.load(Ordering::SeqCst) {
                return Err(DbError::Sqlx(sqlx::Error::Protocol("connection lost".into())));
            }
            Ok(())
        }
    }
}
