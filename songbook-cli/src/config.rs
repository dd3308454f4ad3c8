//! Environment files and the `config` command
//!
//! Settings come from the process environment, topped up from `./.env` and
//! then `~/.songbook/.env`. Variables that are already set always win.

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands::DbArgs;

/// Directory under `$HOME` holding the user-level `.env`
pub const HOME_DIR_NAME: &str = ".songbook";

/// Outcome of loading the env files, reported once tracing is up.
#[derive(Debug, Default)]
pub struct DotenvReport {
    pub loaded: Vec<PathBuf>,
    pub failed: Vec<(PathBuf, String)>,
}

impl DotenvReport {
    pub fn log(&self) {
        for path in &self.loaded {
            tracing::debug!(path = %path.display(), "loaded env file");
        }
        for (path, error) in &self.failed {
            tracing::warn!(path = %path.display(), %error, "skipped unreadable env file");
        }
    }
}

/// `~/.songbook/.env`, if there is a home directory.
pub fn home_env_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(HOME_DIR_NAME).join(".env"))
}

/// Env files in load order.
pub fn env_paths() -> Vec<PathBuf> {
    std::iter::once(PathBuf::from(".env"))
        .chain(home_env_path())
        .collect()
}

/// Load `./.env` then `~/.songbook/.env`.
pub fn load_dotenv() -> DotenvReport {
    load_files(&env_paths())
}

fn load_files(paths: &[PathBuf]) -> DotenvReport {
    let mut report = DotenvReport::default();

    for path in paths.iter().filter(|p| p.is_file()) {
        match dotenvy::from_path(path) {
            Ok(()) => report.loaded.push(path.clone()),
            Err(err) => report.failed.push((path.clone(), err.to_string())),
        }
    }

    report
}

#[derive(Parser, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective database settings (password redacted)
    Show(ShowArgs),
    /// Show where env files are read from
    Path,
}

#[derive(Parser, Debug)]
pub struct ShowArgs {
    #[command(flatten)]
    pub db: DbArgs,
}

pub fn run_config(args: ConfigArgs) -> Result<()> {
    match args.command {
        ConfigCommands::Show(show) => {
            let config = show.db.to_config()?;
            println!("database:        {}", config.redacted_url());
            println!("max_connections: {}", config.max_connections);
            println!("acquire_timeout: {}s", config.acquire_timeout.as_secs());
        }
        ConfigCommands::Path => {
            for path in env_paths() {
                println!("{}{}", path.display(), presence(&path));
            }
        }
    }
    Ok(())
}

fn presence(path: &Path) -> &'static str {
    if path.is_file() {
        ""
    } else {
        " (missing)"
    }
}
