//! Handlers for resources and their views.
//!
//! Resources are listed and created under their dataset and addressed by
//! id afterwards; views likewise under their resource.

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
};
use folio_core::{
  dataset::{
    NewResource, NewResourceView, Resource, ResourcePatch, ResourceView,
    ResourceViewPatch,
  },
  search::SearchIndex,
  store::CatalogStore,
};
use uuid::Uuid;

use crate::{AppState, auth::CurrentActor, error::ApiError};

// ─── Resources ───────────────────────────────────────────────────────────────

/// `GET /datasets/{id}/resources`, in position order.
pub async fn list<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
) -> Result<Json<Vec<Resource>>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.list_resources(&actor, &id).await?))
}

/// `POST /datasets/{id}/resources`
pub async fn create<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(id): Path<String>,
  Json(body): Json<NewResource>,
) -> Result<(StatusCode, Json<Resource>), ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let resource = state.catalog.create_resource(&actor, &id, body).await?;
  Ok((StatusCode::CREATED, Json(resource)))
}

/// `GET /resources/{resource_id}`
pub async fn get_one<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(resource_id): Path<Uuid>,
) -> Result<Json<Resource>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.read_resource(&actor, resource_id).await?))
}

/// `PATCH /resources/{resource_id}`
pub async fn update<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(resource_id): Path<Uuid>,
  Json(patch): Json<ResourcePatch>,
) -> Result<Json<Resource>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.update_resource(&actor, resource_id, patch).await?))
}

/// `DELETE /resources/{resource_id}`
pub async fn delete<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(resource_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  state.catalog.delete_resource(&actor, resource_id).await?;
  Ok(StatusCode::NO_CONTENT)
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// `GET /resources/{resource_id}/views`
pub async fn list_views<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(resource_id): Path<Uuid>,
) -> Result<Json<Vec<ResourceView>>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.list_views(&actor, resource_id).await?))
}

/// `POST /resources/{resource_id}/views`
pub async fn create_view<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(resource_id): Path<Uuid>,
  Json(body): Json<NewResourceView>,
) -> Result<(StatusCode, Json<ResourceView>), ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let view = state.catalog.create_view(&actor, resource_id, body).await?;
  Ok((StatusCode::CREATED, Json(view)))
}

/// `GET /views/{view_id}`
pub async fn get_view<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(view_id): Path<Uuid>,
) -> Result<Json<ResourceView>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.read_view(&actor, view_id).await?))
}

/// `PATCH /views/{view_id}`
pub async fn update_view<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(view_id): Path<Uuid>,
  Json(patch): Json<ResourceViewPatch>,
) -> Result<Json<ResourceView>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.update_view(&actor, view_id, patch).await?))
}

/// `DELETE /views/{view_id}`
pub async fn delete_view<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(view_id): Path<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  state.catalog.delete_view(&actor, view_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
