//! HTTP server command
//!
//! Connects to Postgres, optionally migrates, and serves the song API until
//! Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use songbook_server::db::{migrations, PgDatabase};
use songbook_server::models::Validator;
use songbook_server::{run_server, AppState, DataStore, ServerConfig, SongService};

use super::DbArgs;

/// Arguments for the serve command
#[derive(Parser, Debug)]
pub struct ServeArgs {
    /// Address to bind to (default: 127.0.0.1:3030)
    #[arg(long, short = 'b', env = "SONGBOOK_BIND", default_value = "127.0.0.1:3030")]
    pub bind: SocketAddr,

    /// Allow permissive CORS (all origins) - use with caution
    #[arg(long)]
    pub cors_permissive: bool,

    /// Deadline for each write, in seconds (0 disables it)
    #[arg(long, env = "SONGBOOK_REQUEST_TIMEOUT", default_value_t = 30)]
    pub request_timeout: u64,

    /// Create the songs table before serving
    #[arg(long)]
    pub migrate: bool,

    #[command(flatten)]
    pub db: DbArgs,
}

impl ServeArgs {
    fn server_config(&self) -> ServerConfig {
        ServerConfig {
            bind_addr: self.bind,
            cors_permissive: self.cors_permissive,
            request_timeout: (self.request_timeout > 0).then(|| Duration::from_secs(self.request_timeout)),
        }
    }
}

/// Run the HTTP server
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let db_config = args.db.to_config()?;
    let config = args.server_config();

    tracing::info!(bind = %config.bind_addr, "Starting songbook server");

    // Startup is fatal without a reachable database
    let db = PgDatabase::connect(&db_config)
        .await
        .context("Failed to connect to database")?;

    if args.migrate {
        migrations::run(&db).await.context("Failed to run migrations")?;
    }

    let store = DataStore::new(db);
    let mut songs = SongService::new(store.clone());
    if let Some(timeout) = config.request_timeout {
        songs = songs.with_timeout(timeout);
    }

    let state = AppState {
        songs,
        validator: Validator::default(),
    };

    // Blocks until shutdown
    let served = run_server(state, config).await.context("Server error");

    store.close().await;
    served
}
