//! Pawsight server binary.
//!
//! Reads `config.toml` (or the path given with `--config`), opens the SQLite
//! store, serves the JSON API under `/api` and recomputes insights for every
//! dog on a fixed interval.
//!
//! # Token hash generation
//!
//! To generate the argon2 PHC string for `api_token_hash`:
//!
//! ```
//! cargo run -p pawsight-server -- hash-token
//! ```

mod refresh;
mod settings;

use std::{path::PathBuf, sync::Arc, time::Duration};

use anyhow::Context as _;
use argon2::{Argon2, PasswordHasher, password_hash::SaltString};
use axum::Router;
use chrono::Utc;
use clap::{Parser, Subcommand};
use pawsight_insights::{AnalysisScope, run_cycle};
use pawsight_store_sqlite::SqliteStore;
use rand_core::OsRng;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

use crate::settings::ServerConfig;

#[derive(Parser)]
#[command(author, version, about = "Pawsight insight server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml", global = true)]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the API and run the refresh loop (default).
  Serve,
  /// Run one insight cycle for a dog and print the outcome.
  Recompute {
    #[arg(long)]
    subject: Uuid,
  },
  /// Print the argon2 hash for an API token entered on stdin and exit.
  HashToken,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  if let Some(Command::HashToken) = cli.command {
    let token = read_token()?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
      .hash_password(token.as_bytes(), &salt)
      .map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?
      .to_string();
    println!("{hash}");
    return Ok(());
  }

  let cfg = ServerConfig::load(&cli.config).context("failed to load configuration")?;

  let store_path = cfg.store_path();
  if let Some(parent) = store_path.parent()
    && !parent.as_os_str().is_empty()
  {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("failed to create {parent:?}"))?;
  }
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Some(Command::Recompute { subject }) => recompute(&store, &cfg, subject).await,
    _ => serve(store, cfg).await,
  }
}

async fn serve(store: SqliteStore, cfg: ServerConfig) -> anyhow::Result<()> {
  let refresher = (cfg.refresh_interval_secs > 0).then(|| {
    tokio::spawn(refresh::run(
      store.clone(),
      cfg.rules.clone(),
      cfg.notify.clone(),
      Duration::from_secs(cfg.refresh_interval_secs),
    ))
  });

  let app = Router::new()
    .nest("/api", pawsight_api::api_router(Arc::new(store), cfg.api_settings()))
    .layer(TraceLayer::new_for_http());
  let address = format!("{}:{}", cfg.host, cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  if let Some(handle) = refresher {
    handle.abort();
  }
  tracing::info!("shut down");
  Ok(())
}

async fn recompute(store: &SqliteStore, cfg: &ServerConfig, subject_id: Uuid) -> anyhow::Result<()> {
  let report = run_cycle(store, &cfg.rules, AnalysisScope::new(subject_id, Utc::now())).await;
  println!("{}", report.message());
  println!("{}", serde_json::to_string_pretty(&report.summaries())?);
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
    std::future::pending::<()>().await;
  }
  tracing::info!("shutdown requested");
}

/// Read a token from stdin.
fn read_token() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Token: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  let token = line.trim_end_matches(['\n', '\r']).to_owned();
  anyhow::ensure!(!token.is_empty(), "token must not be empty");
  Ok(token)
}
