//! Error type for catalogue operations.
//!
//! Variants correspond to the outcomes a caller must tell apart; the HTTP
//! layer maps each one to a status code.

use folio_core::{
  plugin::Veto,
  search::IndexError,
  store::{StoreError, StoreFailure},
  validation::ValidationErrors,
};
use thiserror::Error;
use uuid::Uuid;

pub const NAME_TAKEN: &str = "That URL is already in use.";

#[derive(Debug, Error)]
pub enum Error {
  #[error("forbidden: {0}")]
  Forbidden(String),

  #[error("not found: {0}")]
  NotFound(String),

  #[error("validation failed: {0}")]
  Validation(ValidationErrors),

  #[error("activity {0} has not been migrated")]
  UnmigratedActivity(Uuid),

  #[error("search index unavailable: {0}")]
  IndexUnavailable(String),

  #[error(transparent)]
  Vetoed(#[from] Veto),

  #[error("{0}")]
  Index(IndexError),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl From<ValidationErrors> for Error {
  fn from(errors: ValidationErrors) -> Self { Error::Validation(errors) }
}

impl From<IndexError> for Error {
  fn from(e: IndexError) -> Self {
    match e {
      IndexError::Unavailable(msg) => Error::IndexUnavailable(msg),
      other => Error::Index(other),
    }
  }
}

impl From<folio_core::Error> for Error {
  fn from(e: folio_core::Error) -> Self {
    use folio_core::Error as Core;
    match e {
      Core::UnmigratedActivity(id) => Error::UnmigratedActivity(id),
      Core::NoSnapshot(_) | Core::ActivityObjectMismatch { .. } => {
        Error::NotFound(e.to_string())
      }
      Core::InvalidSort(_) => {
        Error::Validation(ValidationErrors::single("sort", e.to_string()))
      }
      other => Error::Store(Box::new(other)),
    }
  }
}

/// Classify a backend error without knowing the backend.
pub(crate) fn store_error<E: StoreError>(e: E) -> Error {
  match e.failure() {
    StoreFailure::NotFound => Error::NotFound(e.to_string()),
    StoreFailure::NameTaken => {
      Error::Validation(ValidationErrors::single("name", NAME_TAKEN))
    }
    StoreFailure::Other => Error::Store(Box::new(e)),
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
