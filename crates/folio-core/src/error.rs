//! Error types for `folio-core`.

use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum Error {
  #[error("unknown {kind} discriminant: {value:?}")]
  UnknownDiscriminant { kind: &'static str, value: String },

  #[error("invalid sort order: {0:?}")]
  InvalidSort(String),

  #[error("activity {0} was recorded with an unmigrated schema")]
  UnmigratedActivity(Uuid),

  #[error("activity {0} carries no dataset snapshot")]
  NoSnapshot(Uuid),

  #[error("activity {activity_id} does not belong to object {object_id}")]
  ActivityObjectMismatch { activity_id: Uuid, object_id: Uuid },

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
