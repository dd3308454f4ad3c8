//! Database layer - executor capabilities, pool, transactions, repositories
//!
//! # Design Principles
//!
//! - One pool per process, shared by cloning the handle
//! - Repositories are generic over [`Executor`], so the same code runs on
//!   the pool or inside a transaction
//! - Rely on DB constraints, classify conflicts - no check-then-insert
//! - Multi-step writes go through [`crate::store::DataStore::with_transaction`]

pub mod deadline;
pub mod error;
pub mod executor;
pub mod migrations;
pub mod pool;
pub mod repos;
pub mod transaction;

pub use error::DbError;
pub use executor::{Executor, PgQuery, PgQueryAs, Transactor, TxHandle};
pub use pool::{create_pool, ConnectError, PgDatabase};
pub use repos::{Song, SongRepository};
pub use transaction::{AccessMode, IsolationLevel, PgTransaction, TxOptions};
