//! Application services
//!
//! Services own a pool-scoped [`DataStore`](crate::store::DataStore) and decide
//! which operations need a unit of work. They only ever return
//! [`AppError`](crate::error::AppError).

pub mod songs;

pub use songs::SongService;
