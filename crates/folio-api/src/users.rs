//! Handlers for `/users` endpoints.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
};
use folio_core::{
  actor::Actor,
  search::SearchIndex,
  store::CatalogStore,
  user::{NewUser, User},
  validation::{MISSING_VALUE, ValidationErrors},
};
use serde::Deserialize;

use crate::{
  AppState,
  auth::{CurrentActor, hash_password},
  error::ApiError,
};

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
  pub name:         String,
  #[serde(default)]
  pub display_name: Option<String>,
  #[serde(default)]
  pub password:     String,
  /// Only honoured when a sysadmin registers the user.
  #[serde(default)]
  pub sysadmin:     bool,
}

/// `POST /users`
pub async fn register<S, I>(
  State(state): State<AppState<S, I>>,
  CurrentActor(actor): CurrentActor,
  Json(body): Json<RegisterBody>,
) -> Result<(StatusCode, Json<User>), ApiError>
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  if body.password.is_empty() {
    return Err(ValidationErrors::single("password", MISSING_VALUE).into());
  }
  let password_hash = hash_password(&body.password)
    .map_err(|e| ApiError::BadRequest(format!("unusable password: {e}")))?;

  let input = NewUser {
    display_name: body.display_name,
    sysadmin: body.sysadmin,
    password_hash: Some(password_hash),
    ..NewUser::new(body.name)
  };
  let user = state.catalog.register_user(&actor, input).await?;
  Ok((StatusCode::CREATED, Json(user)))
}

/// `GET /users/me`
pub async fn me(CurrentActor(actor): CurrentActor) -> Result<Json<User>, ApiError> {
  match actor {
    Actor::User(ctx) => Ok(Json(ctx.user)),
    Actor::Anonymous => Err(ApiError::Unauthorized),
  }
}
