//! Handlers for `/datasets` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `POST`   | `/datasets` | Body: [`NewDataset`]; created as a draft unless `state` says otherwise |
//! | `GET`    | `/datasets/new` | What the new-dataset form should offer; optional `?owner_org=` |
//! | `GET`    | `/datasets/{id}` | By id or name; id lookups set `Content-Location` |
//! | `PATCH`  | `/datasets/{id}` | Body: [`DatasetPatch`] |
//! | `DELETE` | `/datasets/{id}` | |
//! | `POST`   | `/datasets/{id}/activate` | Needs at least one resource |
//! | `PUT`    | `/datasets/{id}/follow` | |
//! | `DELETE` | `/datasets/{id}/follow` | |
//! | `GET`    | `/datasets/{id}/followers` | Sysadmins only |

use axum::{
  Json,
  extract::{Path, Query, State},
  http::{HeaderValue, StatusCode, header},
  response::{IntoResponse, Response},
};
use folio_catalog::{DatasetForm, DatasetRead};
use folio_core::{
  dataset::{DatasetDict, DatasetPatch, NewDataset},
  search::SearchIndex,
  store::CatalogStore,
  user::User,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, auth::CurrentActor, error::ApiError};

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /datasets`
pub async fn create<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewDataset>,
) -> Result<(StatusCode, Json<DatasetDict>), ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let dict = state.catalog.create_dataset(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(dict)))
}

#[derive(Debug, Deserialize)]
pub struct FormParams {
  pub owner_org: Option<Uuid>,
}

/// `GET /datasets/new[?owner_org=<uuid>]`
pub async fn new_form<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Query(params): Query<FormParams>,
) -> Result<Json<DatasetForm>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.new_dataset_form(&actor, params.owner_org).await?))
}

// ─── Read ────────────────────────────────────────────────────────────────────

/// `GET /datasets/{id}`
pub async fn get_one<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<Response, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let read: DatasetRead = state.catalog.read_dataset(&actor, &id).await?;
  let location = read
    .redirect_to
    .as_deref()
    .and_then(|name| HeaderValue::from_str(&format!("/datasets/{name}")).ok());

  let mut res = Json(read).into_response();
  if let Some(location) = location {
    res.headers_mut().insert(header::CONTENT_LOCATION, location);
  }
  Ok(res)
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PATCH /datasets/{id}`
pub async fn update<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Json(patch): Json<DatasetPatch>,
) -> Result<Json<DatasetDict>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.update_dataset(&actor, &id, patch).await?))
}

/// `POST /datasets/{id}/activate`
pub async fn activate<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<Json<DatasetDict>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.activate_dataset(&actor, &id).await?))
}

/// `DELETE /datasets/{id}`
pub async fn delete<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  state.catalog.delete_dataset(&actor, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Following ───────────────────────────────────────────────────────────────

/// `PUT /datasets/{id}/follow`
pub async fn follow<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  state.catalog.follow_dataset(&actor, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `DELETE /datasets/{id}/follow`
pub async fn unfollow<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  state.catalog.unfollow_dataset(&actor, &id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `GET /datasets/{id}/followers`
pub async fn followers<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<Json<Vec<User>>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.followers(&actor, &id).await?))
}
