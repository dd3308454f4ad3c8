//! Raw database error type
//!
//! Everything the executor layer returns is driver-shaped and unclassified.
//! Classification into the application taxonomy happens in
//! [`crate::error::classify`], as close to the call site as possible.

/// Unclassified error from the executor layer.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// A single-row fetch matched more than one row.
    #[error("query returned more than one row")]
    TooManyRows,

    /// The caller's deadline elapsed before the operation finished.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// The transaction handle was used after commit or rollback.
    #[error("transaction has already been committed or rolled back")]
    TransactionFinished,
}

impl DbError {
    /// True when this is the "no rows" sentinel.
    pub fn is_no_rows(&self) -> bool {
        matches!(self, Self::Sqlx(sqlx::Error::RowNotFound))
    }
}

impl From<tokio::time::error::Elapsed> for DbError {
    fn from(_: tokio::time::error::Elapsed) -> Self {
        Self::DeadlineExceeded
    }
}
