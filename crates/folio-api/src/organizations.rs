//! Handlers for `/organizations` endpoints.

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
};
use folio_catalog::ActivityStream;
use folio_core::{
  dataset::Dataset,
  organization::{Capacity, Membership, NewOrganization, Organization},
  search::SearchIndex,
  store::CatalogStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{AppState, activity::PageParams, auth::CurrentActor, error::ApiError};

/// `POST /organizations`; the caller becomes its admin.
pub async fn create<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<NewOrganization>,
) -> Result<(StatusCode, Json<Organization>), ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let org = state.catalog.create_organization(&actor, body).await?;
  Ok((StatusCode::CREATED, Json(org)))
}

/// `DELETE /organizations/{org}`
pub async fn delete<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(org): Path<String>,
) -> Result<Json<Organization>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.delete_organization(&actor, &org).await?))
}

/// `GET /users/me/organizations`: where the caller may add datasets.
pub async fn editable<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Organization>>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.editable_organizations(&actor).await?))
}

/// `GET /organizations/{org}/datasets`
pub async fn datasets<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(org): Path<String>,
) -> Result<Json<Vec<Dataset>>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  Ok(Json(state.catalog.organization_datasets(&actor, &org).await?))
}

/// `GET /organizations/{org}/activity[?limit=&offset=]`
pub async fn activity<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path(org): Path<String>,
  Query(page): Query<PageParams>,
) -> Result<Json<ActivityStream>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let stream = state
    .catalog
    .organization_activity(&actor, &org, page.limit(), page.offset())
    .await?;
  Ok(Json(stream))
}

// ─── Members ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct MemberBody {
  pub capacity: Capacity,
}

/// `PUT /organizations/{org}/members/{user_id}`: adds the user or
/// replaces their capacity.
pub async fn set_member<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path((org, user_id)): Path<(String, Uuid)>,
  Json(body): Json<MemberBody>,
) -> Result<Json<Membership>, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  let membership = state
    .catalog
    .set_membership(&actor, &org, user_id, body.capacity)
    .await?;
  Ok(Json(membership))
}

/// `DELETE /organizations/{org}/members/{user_id}`
pub async fn remove_member<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Path((org, user_id)): Path<(String, Uuid)>,
) -> Result<StatusCode, ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  state.catalog.remove_membership(&actor, &org, user_id).await?;
  Ok(StatusCode::NO_CONTENT)
}
