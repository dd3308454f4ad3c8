//! Schema migration command

use anyhow::{Context, Result};
use clap::Parser;

use songbook_server::db::{migrations, PgDatabase, Transactor};

use super::DbArgs;

/// Arguments for the migrate command
#[derive(Parser, Debug)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub db: DbArgs,
}

/// Create the songs table and indexes. Safe to run repeatedly.
pub async fn run_migrate(args: MigrateArgs) -> Result<()> {
    let db_config = args.db.to_config()?;

    let db = PgDatabase::connect(&db_config)
        .await
        .context("Failed to connect to database")?;

    let migrated = migrations::run(&db).await.context("Failed to run migrations");
    db.close().await;
    migrated?;

    println!("Migrations applied to {}", db_config.redacted_url());
    Ok(())
}
