//! HTTP server layer
//!
//! Axum server with:
//! - CORS (localhost only by default)
//! - Request tracing
//! - Graceful shutdown
//! - JSON error responses rendered from [`AppError`](crate::error::AppError)

pub mod extractors;
pub mod routes;
pub mod server;

pub use server::{build_router, run_server, serve_until, AppState, ServerConfig, ServerError};
