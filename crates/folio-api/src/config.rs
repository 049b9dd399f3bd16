//! Runtime configuration shared by `folio-server` and the `folio` CLI.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use folio_catalog::Catalog;
use folio_core::{authz::AuthPolicy, search::SearchConfig};
use folio_search::SqliteIndex;
use folio_store_sqlite::SqliteStore;
use serde::Deserialize;

/// The catalogue as deployed: SQLite entities and an FTS5 index.
pub type SqliteCatalog = Catalog<SqliteStore, SqliteIndex>;

/// Deserialised from `folio.toml`, overridden by `FOLIO_*` variables.
/// Nested keys use `__`, e.g. `FOLIO_SEARCH__MAX_ROWS=500`.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  #[serde(default = "default_index_path")]
  pub index_path: PathBuf,
  #[serde(default)]
  pub auth:       AuthPolicy,
  #[serde(default)]
  pub search:     SearchConfig,
}

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 5000 }
fn default_store_path() -> PathBuf { PathBuf::from("folio.db") }
fn default_index_path() -> PathBuf { PathBuf::from("folio-index.db") }

impl ServerConfig {
  /// Layer the environment over the file at `path`, which may be absent.
  pub fn load(path: &Path) -> Result<Self, ::config::ConfigError> {
    ::config::Config::builder()
      .add_source(::config::File::from(path).required(false))
      .add_source(
        ::config::Environment::with_prefix("FOLIO")
          .prefix_separator("_")
          .separator("__")
          .try_parsing(true),
      )
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// Open the store and the index and wire them into a catalogue.
  pub async fn open_catalog(&self) -> anyhow::Result<SqliteCatalog> {
    let store_path = expand_tilde(&self.store_path);
    let store = SqliteStore::open(&store_path)
      .await
      .with_context(|| format!("failed to open store at {store_path:?}"))?;

    let index_path = expand_tilde(&self.index_path);
    let index = SqliteIndex::open(&index_path)
      .await
      .with_context(|| format!("failed to open search index at {index_path:?}"))?;

    tracing::info!(store = ?store_path, index = ?index_path, "opened catalogue");
    Ok(
      Catalog::new(Arc::new(store), Arc::new(index))
        .with_policy(self.auth)
        .with_search_config(self.search),
    )
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let config = ServerConfig::load(Path::new("/nonexistent/folio.toml")).unwrap();
    assert_eq!(config.port, 5000);
    assert!(config.auth.create_unowned_dataset);
    assert_eq!(config.search.default_rows, 20);
    assert_eq!(config.search.max_rows, 1000);
  }

  #[test]
  fn tilde_expands_to_home() {
    let Ok(home) = std::env::var("HOME") else { return };
    assert_eq!(
      expand_tilde(Path::new("~/folio.db")),
      PathBuf::from(home).join("folio.db")
    );
    assert_eq!(expand_tilde(Path::new("/var/folio.db")), PathBuf::from("/var/folio.db"));
  }
}
