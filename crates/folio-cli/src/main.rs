//! `folio`: administration commands for a Folio catalogue.
//!
//! Operates on the store and index named in the server configuration, so
//! it can run while the server is stopped.
//!
//! # Usage
//!
//! ```text
//! folio search-index rebuild --refresh
//! folio search-index clear my-dataset
//! echo "$PASSWORD" | folio user add alice --sysadmin
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use folio_api::{ServerConfig, SqliteCatalog, auth::hash_password};
use folio_catalog::{RebuildOptions, RebuildReport};
use folio_core::{store::CatalogStore, user::NewUser};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "folio", version, about = "Administer a Folio data catalogue")]
struct Args {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "folio.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Maintain the search index.
  #[command(subcommand)]
  SearchIndex(IndexCommand),
  /// Manage user accounts.
  #[command(subcommand)]
  User(UserCommand),
}

#[derive(Subcommand, Debug)]
enum IndexCommand {
  /// Remove one dataset from the index, or everything.
  Clear {
    /// Dataset id or name.
    name: Option<String>,
  },
  /// Re-index one dataset, or every dataset.
  Rebuild {
    /// Dataset id or name.
    name:         Option<String>,
    /// Only index datasets that are not in the index yet.
    #[arg(long)]
    only_missing: bool,
    /// Log failures and carry on instead of stopping at the first one.
    #[arg(long)]
    force:        bool,
    /// Update the index in place instead of clearing it first.
    #[arg(long)]
    refresh:      bool,
  },
}

#[derive(Subcommand, Debug)]
enum UserCommand {
  /// Create a user. The password is read from stdin.
  Add {
    name:         String,
    #[arg(long)]
    display_name: Option<String>,
    #[arg(long)]
    sysadmin:     bool,
  },
}

// ─── Entry point ─────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let args = Args::parse();
  let config = ServerConfig::load(&args.config)
    .with_context(|| format!("failed to load configuration from {:?}", args.config))?;
  let catalog = config.open_catalog().await?;

  match args.command {
    Command::SearchIndex(IndexCommand::Clear { name }) => {
      let removed = catalog
        .clear_index(name.as_deref())
        .await
        .context("clearing search index")?;
      println!("removed {removed} document(s)");
    }
    Command::SearchIndex(IndexCommand::Rebuild { name, only_missing, force, refresh }) => {
      let options = RebuildOptions { only_missing, force, refresh };
      let report = catalog
        .rebuild_index(name.as_deref(), options)
        .await
        .context("rebuilding search index")?;
      print_report(&report);
      if !report.failed.is_empty() {
        bail!("{} dataset(s) could not be indexed", report.failed.len());
      }
    }
    Command::User(UserCommand::Add { name, display_name, sysadmin }) => {
      add_user(&catalog, name, display_name, sysadmin).await?;
    }
  }

  Ok(())
}

fn print_report(report: &RebuildReport) {
  println!(
    "indexed {}, unchanged {}, removed {}, failed {}",
    report.indexed,
    report.unchanged,
    report.removed,
    report.failed.len()
  );
  for id in &report.failed {
    println!("  failed: {id}");
  }
}

/// Created directly in the store: the operator is trusted with any role.
async fn add_user(
  catalog: &SqliteCatalog,
  name: String,
  display_name: Option<String>,
  sysadmin: bool,
) -> Result<()> {
  let password = read_password()?;
  if password.is_empty() {
    bail!("a password is required");
  }
  let password_hash =
    hash_password(&password).map_err(|e| anyhow::anyhow!("argon2 error: {e}"))?;

  let input = NewUser {
    display_name,
    sysadmin,
    password_hash: Some(password_hash),
    ..NewUser::new(name)
  };
  input.validate().context("invalid user")?;
  let user = catalog
    .store()
    .create_user(input)
    .await
    .context("creating user")?;

  tracing::info!(user = %user.user_id, sysadmin = user.sysadmin, "created user");
  println!("{} {}", user.user_id, user.name);
  Ok(())
}

/// Read a password line from stdin.
fn read_password() -> Result<String> {
  use std::io::{self, BufRead, Write};
  eprint!("Password: ");
  io::stderr().flush().ok();
  let mut line = String::new();
  io::stdin().lock().read_line(&mut line)?;
  Ok(line.trim_end_matches(['\n', '\r']).to_owned())
}
