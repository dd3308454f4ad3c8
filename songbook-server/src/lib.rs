//! songbook-server: transactional Postgres core and HTTP API for a song library
//!
//! Layers, bottom up:
//! - [`db`]: executor capabilities, pool and transaction handles, repositories
//! - [`store`]: repository registry and the unit-of-work combinator
//! - [`error`]: the application error taxonomy and classifier
//! - [`service`]: song use cases
//! - [`http`]: axum routes over the services

pub mod config;
pub mod db;
pub mod error;
pub mod http;
pub mod models;
pub mod service;
pub mod store;

pub use config::{ConfigError, DatabaseConfig};
pub use db::{PgDatabase, PgTransaction, Transactor, TxOptions};
pub use error::{AppError, AppResult, ErrorKind};
pub use http::{build_router, run_server, serve_until, AppState, ServerConfig, ServerError};
pub use service::SongService;
pub use store::DataStore;
