//! Health check endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::db::Transactor;
use crate::http::server::AppState;

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub database: &'static str,
}

/// GET /health
///
/// 503 when the database does not answer `SELECT 1` within the service timeout.
async fn health<D: Transactor>(
    State(state): State<Arc<AppState<D>>>,
) -> (StatusCode, Json<HealthResponse>) {
    let (code, status, database) = match state.songs.ping().await {
        Ok(_) => (StatusCode::OK, "ok", "ok"),
        Err(err) => {
            tracing::warn!(error = %err, "health check: database unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "degraded", "unavailable")
        }
    };

    (
        code,
        Json(HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION"),
            database,
        }),
    )
}

/// Health routes
pub fn router<D: Transactor>() -> Router<Arc<AppState<D>>> {
    Router::new().route("/health", get(health::<D>))
}
