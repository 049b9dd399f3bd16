//! Error types for `folio-search`.

use folio_core::search::IndexError;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Why query text could not be turned into an index query.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
  #[error("unbalanced quotation mark")]
  UnbalancedQuote,

  #[error("operator {0} is not between two terms")]
  DanglingOperator(String),

  #[error("invalid term {0:?}")]
  InvalidTerm(String),

  #[error("unknown field {0:?}")]
  UnknownField(String),

  #[error("field {0:?} has no value")]
  EmptyValue(String),

  #[error("negated terms cannot be combined with OR")]
  NegatedAlternative,
}

impl From<ParseError> for IndexError {
  fn from(e: ParseError) -> Self { IndexError::Query(e.to_string()) }
}

/// Sort a connection error into the index error taxonomy.
pub(crate) fn classify(e: tokio_rusqlite::Error) -> IndexError {
  match e {
    tokio_rusqlite::Error::ConnectionClosed => {
      IndexError::Unavailable("connection closed".into())
    }
    tokio_rusqlite::Error::Rusqlite(e) => classify_sqlite(e),
    other => IndexError::Backend(other.to_string()),
  }
}

fn classify_sqlite(e: rusqlite::Error) -> IndexError {
  match &e {
    rusqlite::Error::SqliteFailure(f, _)
      if matches!(f.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
    {
      IndexError::Unavailable(e.to_string())
    }
    rusqlite::Error::SqliteFailure(_, Some(msg)) if msg.contains("fts5") => {
      IndexError::Query(msg.clone())
    }
    _ => IndexError::Backend(e.to_string()),
  }
}
