//! Error type for `folio-store-sqlite`.

use folio_core::store::{StoreError, StoreFailure};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] folio_core::Error),

  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("sqlite error: {0}")]
  Sqlite(#[from] rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date/time parse error: {0}")]
  DateParse(String),

  #[error("user not found: {0}")]
  UserNotFound(Uuid),

  #[error("organization not found: {0}")]
  OrganizationNotFound(Uuid),

  #[error("dataset not found: {0}")]
  DatasetNotFound(Uuid),

  #[error("resource not found: {0}")]
  ResourceNotFound(Uuid),

  #[error("resource view not found: {0}")]
  ViewNotFound(Uuid),

  #[error("{kind} name {name:?} is already in use")]
  NameTaken { kind: &'static str, name: String },
}

impl StoreError for Error {
  fn failure(&self) -> StoreFailure {
    match self {
      Error::UserNotFound(_)
      | Error::OrganizationNotFound(_)
      | Error::DatasetNotFound(_)
      | Error::ResourceNotFound(_)
      | Error::ViewNotFound(_) => StoreFailure::NotFound,
      Error::NameTaken { .. } => StoreFailure::NameTaken,
      _ => StoreFailure::Other,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
