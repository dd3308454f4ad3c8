//! Command modules for the songbook CLI

pub mod migrate;
pub mod serve;

use anyhow::{Context, Result};
use clap::Args;
use songbook_server::config::DEFAULT_MAX_CONNECTIONS;
use songbook_server::DatabaseConfig;

pub use migrate::{run_migrate, MigrateArgs};
pub use serve::{run_serve, ServeArgs};

/// Database connection flags, each backed by its `DB_*` variable.
#[derive(Args, Debug, Clone)]
pub struct DbArgs {
    /// Database host
    #[arg(long, env = "DB_HOST", default_value = "localhost")]
    pub db_host: String,

    /// Database port
    #[arg(long, env = "DB_PORT", default_value_t = 5432)]
    pub db_port: u16,

    /// Database user
    #[arg(long, env = "DB_USER")]
    pub db_user: Option<String>,

    /// Database password
    #[arg(long, env = "DB_PASSWORD", hide_env_values = true)]
    pub db_password: Option<String>,

    /// Database name
    #[arg(long, env = "DB_NAME")]
    pub db_name: Option<String>,

    /// libpq sslmode (disable, prefer, require, ...)
    #[arg(long, env = "DB_SSLMODE", default_value = "prefer")]
    pub db_sslmode: String,

    /// Maximum pooled connections
    #[arg(long, env = "DB_MAX_CONNECTIONS", default_value_t = DEFAULT_MAX_CONNECTIONS)]
    pub db_max_connections: u32,
}

impl DbArgs {
    /// Resolve into a validated [`DatabaseConfig`].
    pub fn to_config(&self) -> Result<DatabaseConfig> {
        DatabaseConfig::from_lookup(|key| match key {
            "DB_HOST" => Some(self.db_host.clone()),
            "DB_PORT" => Some(self.db_port.to_string()),
            "DB_USER" => self.db_user.clone(),
            "DB_PASSWORD" => self.db_password.clone(),
            "DB_NAME" => self.db_name.clone(),
            "DB_SSLMODE" => Some(self.db_sslmode.clone()),
            "DB_MAX_CONNECTIONS" => Some(self.db_max_connections.to_string()),
            _ => None,
        })
        .context("Invalid database settings. Set DB_* via flags, environment, or ~/.songbook/.env")
    }
}
