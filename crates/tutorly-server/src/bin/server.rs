//! tutorly server binary.
//!
//! Reads `tutorly.toml` (or the path specified with `--config`), opens the
//! provisioned SQLite store, loads the working set, and keeps it in sync
//! until Ctrl-C, when it saves and disconnects.
//!
//! # Provisioning a store
//!
//! ```sh
//! cargo run -p tutorly-server --bin server -- init
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use tutorly_core::store::Store as _;
use tutorly_server::ServerConfig;
use tutorly_store_sqlite::SqliteStore;
use tutorly_sync::Engine;

#[derive(Parser)]
#[command(author, version, about = "Tutorly administrative backend")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "tutorly.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Create an empty store with the current schema and exit.
  Init,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let server_cfg = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to read config {:?}", cli.config))?;
  let store_path = server_cfg.resolved_store_path();

  if let Some(Command::Init) = cli.command {
    let store = SqliteStore::create(&store_path)
      .await
      .with_context(|| format!("failed to create store at {store_path:?}"))?;
    store.disconnect().await?;
    tracing::info!("created store at {}", store_path.display());
    return Ok(());
  }

  // A missing store is fatal; there is nothing to serve.
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let engine = Engine::start(store, server_cfg.catalog(), server_cfg.sync_options())
    .await
    .context("failed to load working set")?;

  let entities = engine.working_set().await.len();
  tracing::info!(
    entities,
    interval = ?server_cfg.sync_interval(),
    "serving"
  );

  let shutdown = async {
    if let Err(e) = tokio::signal::ctrl_c().await {
      tracing::error!(error = %e, "cannot listen for shutdown signal");
    }
  };

  let report = tutorly_server::serve_until(&engine, server_cfg.sync_interval(), shutdown)
    .await
    .context("final save failed")?;

  tracing::info!(%report, "stopped");
  Ok(())
}
