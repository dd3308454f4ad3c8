//! Repository implementations for database access
//!
//! Each repository follows these patterns:
//! - Generic over [`Executor`](super::Executor), never over a concrete handle
//! - Uses window functions for totals (no second round-trip per page)
//! - Returns classified [`AppError`](crate::error::AppError)s

pub mod songs;

pub use songs::{Song, SongRepository};
