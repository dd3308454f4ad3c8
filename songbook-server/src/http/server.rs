//! Axum server setup
//!
//! CORS limited to same-port localhost origins unless configured otherwise,
//! request tracing, and graceful shutdown on SIGTERM/Ctrl+C.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, HeaderValue, Method};
use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use super::routes;
use crate::db::Transactor;
use crate::models::Validator;
use crate::service::SongService;

/// Versioned API prefix
pub const API_PREFIX: &str = "/api/v1";

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to (default: 127.0.0.1:3030)
    pub bind_addr: SocketAddr,

    /// Accept any origin instead of localhost on the bind port
    pub cors_permissive: bool,

    /// Deadline for each unit of work, measured from its start.
    pub request_timeout: Option<Duration>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([127, 0, 0, 1], 3030)),
            cors_permissive: false,
            request_timeout: Some(Duration::from_secs(30)),
        }
    }
}

/// Shared application state
pub struct AppState<D> {
    pub songs: SongService<D>,
    pub validator: Validator,
}

/// Build the application router.
pub fn build_router<D: Transactor>(state: AppState<D>, config: &ServerConfig) -> Router {
    Router::new()
        .merge(routes::health::router::<D>())
        .nest(API_PREFIX, routes::songs::router::<D>())
        .layer(cors_layer(config))
        .layer(TraceLayer::new_for_http())
        .with_state(Arc::new(state))
}

/// Same-port localhost origins unless `cors_permissive` is set.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    if config.cors_permissive {
        tracing::warn!("CORS: permissive mode, any origin may call the API");
        return CorsLayer::permissive();
    }

    let port = config.bind_addr.port();
    let origins = ["localhost", "127.0.0.1"]
        .into_iter()
        .filter_map(|host| HeaderValue::from_str(&format!("http://{host}:{port}")).ok());

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
}

/// Run the HTTP server until Ctrl+C or SIGTERM.
///
/// # Example
///
/// ```ignore
/// let db = PgDatabase::connect(&db_config).await?;
/// let songs = SongService::new(DataStore::new(db));
/// let state = AppState { songs, validator: Validator::default() };
/// run_server(state, ServerConfig::default()).await?;
/// ```
pub async fn run_server<D: Transactor>(state: AppState<D>, config: ServerConfig) -> Result<(), ServerError> {
    serve_until(state, config, shutdown_signal()).await
}

/// Run the HTTP server until `shutdown` resolves, then drain open requests.
pub async fn serve_until<D, S>(state: AppState<D>, config: ServerConfig, shutdown: S) -> Result<(), ServerError>
where
    D: Transactor,
    S: Future<Output = ()> + Send + 'static,
{
    let app = build_router(state, &config);

    let listener = TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "songbook API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let signal = wait_for_signal().await;
    tracing::info!(signal, "shutting down");
}

#[cfg(unix)]
async fn wait_for_signal() -> &'static str {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = match signal(SignalKind::terminate()) {
        Ok(terminate) => terminate,
        Err(err) => {
            tracing::warn!(error = %err, "no SIGTERM handler, waiting for Ctrl+C only");
            return ctrl_c().await;
        }
    };

    tokio::select! {
        name = ctrl_c() => name,
        _ = terminate.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() -> &'static str {
    ctrl_c().await
}

/// Never resolves if the handler cannot be installed.
async fn ctrl_c() -> &'static str {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "no Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    "Ctrl+C"
}

/// Server error type
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
