//! Handlers for activity streams and dataset versions.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/datasets/{id}/activity` | `?limit=&offset=`, newest first |
//! | `POST` | `/datasets/{id}/activity` | Body: `{"activity_type":"...","extra":{...}}` |
//! | `GET`  | `/datasets/{id}/activity/{activity_id}` | The dataset as of that activity |
//! | `GET`  | `/datasets/{id}/diff` | `?before=<uuid>&after=<uuid>` |
//! | `GET`  | `/activity/{activity_id}/changes` | Against the previous activity |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use folio_catalog::{ActivityChanges, ActivityStream};
use folio_core::{
  activity::{Activity, ChangeSet},
  dataset::DatasetDict,
  search::SearchIndex,
  store::CatalogStore,
};
use serde::Deserialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::{AppState, auth::CurrentActor, error::ApiError};

pub const DEFAULT_LIMIT: usize = 31;
pub const MAX_LIMIT: usize = 100;

#[derive(Debug, Deserialize, Default)]
pub struct PageParams {
  pub limit:  Option<usize>,
  pub offset: Option<usize>,
}

impl PageParams {
  pub fn limit(&self) -> usize { self.limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) }

  pub fn offset(&self) -> usize { self.offset.unwrap_or(0) }
}

/// `GET /datasets/{id}/activity`
pub async fn stream<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Query(page): Query<PageParams>,
) -> Result<Json<ActivityStream>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let stream = state
    .catalog
    .get_activity_stream(&actor, &id, page.limit(), page.offset())
    .await?;
  Ok(Json(stream))
}

/// `GET /datasets/{id}/activity/{activity_id}`
pub async fn snapshot<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path((id, activity_id)): Path<(String, Uuid)>,
) -> Result<Json<DatasetDict>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.snapshot_at(&actor, &id, activity_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct DiffParams {
  pub before: Uuid,
  pub after:  Uuid,
}

/// `GET /datasets/{id}/diff?before=<uuid>&after=<uuid>`
pub async fn diff<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Query(params): Query<DiffParams>,
) -> Result<Json<ChangeSet>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let changes = state
    .catalog
    .diff(&actor, &id, params.before, params.after)
    .await?;
  Ok(Json(changes))
}

/// `GET /activity/{activity_id}/changes`
pub async fn changes<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(activity_id): Path<Uuid>,
) -> Result<Json<ActivityChanges>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.changes(&actor, activity_id).await?))
}

#[derive(Debug, Deserialize)]
pub struct CustomActivityBody {
  pub activity_type: String,
  #[serde(default)]
  pub extra:         Map<String, Value>,
}

/// `POST /datasets/{id}/activity`
pub async fn record_custom<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Json(body): Json<CustomActivityBody>,
) -> Result<(StatusCode, Json<Activity>), ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let activity = state
    .catalog
    .record_custom_activity(&actor, &id, &body.activity_type, body.extra)
    .await?;
  Ok((StatusCode::CREATED, Json(activity)))
}
