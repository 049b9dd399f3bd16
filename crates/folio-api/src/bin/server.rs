//! folio-server binary.
//!
//! Reads `folio.toml` (or the path given with `--config`), opens the SQLite
//! store and search index, and serves the JSON API over HTTP.
//!
//! # Password hash generation
//!
//! Users are normally created with `folio user add`. To produce an argon2
//! PHC string by hand:
//!
//! ```text
//! cargo run -p folio-api --bin folio-server -- --hash-password
//! ```

use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;
use folio_api::{AppState, ServerConfig, auth::hash_password};
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Folio data catalogue server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "folio.toml")]
  config: PathBuf,

  /// Print the argon2 hash for a password entered on stdin and exit.
  #[arg(long)]
  hash_password: bool,
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

  if cli.hash_password {
    let password = read_password()?;
    let hash = hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;
    println!("{hash}");
    return Ok(());
  }

  let config = ServerConfig::load(&cli.config)
    .with_context(|| format!("failed to load configuration from {:?}", cli.config))?;
  let catalog = config.open_catalog().await?;

  let address = config.address();
  let state = AppState { catalog };
  let app = folio_api::router(state);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> anyhow::Result<String> {
  use std::io::{self, BufRead, Write};
  print!("Password: ");
  io::stdout().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
