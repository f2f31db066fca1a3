//! `quire`: command-line front end for a Quire collection store.
//!
//! Reads `quire.toml` (or the path given with `--config`), opens the SQLite
//! store it names and runs one command. Commands act on behalf of the user
//! named with `--as`; collection-scoped commands check that user's level
//! before doing anything. Results are printed as JSON.

mod commands;
mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use quire_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::{commands::Command, settings::Settings};

#[derive(Parser)]
#[command(author, version, about = "Quire collection store")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "quire.toml")]
  config: PathBuf,

  /// Username to act as.
  #[arg(long = "as", global = true, value_name = "USERNAME")]
  actor: Option<String>,

  #[command(subcommand)]
  command: Command,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Logs go to stderr so stdout stays parseable.
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let settings = Settings::load(&cli.config)?;

  let store = SqliteStore::open_with(&settings.store)
    .await
    .with_context(|| format!("failed to open store at {:?}", settings.store.path))?;

  let output = commands::run(&store, cli.actor, cli.command).await?;
  println!("{}", serde_json::to_string_pretty(&output)?);
  Ok(())
}
