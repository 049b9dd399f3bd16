//! HTTP Basic authentication resolving to an [`Actor`].
//!
//! Requests without an `Authorization` header act anonymously. A header
//! that is present but wrong is always a 401, never a silent downgrade.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::{
  extract::FromRequestParts,
  http::{HeaderMap, header, request::Parts},
};
use base64::{Engine as _, engine::general_purpose::STANDARD as B64};
use folio_core::{actor::Actor, search::SearchIndex, store::CatalogStore};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The actor making the request.
#[derive(Debug, Clone)]
pub struct CurrentActor(pub Actor);

/// Produce the argon2 PHC string stored for a password.
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
  let salt = SaltString::generate(&mut OsRng);
  Ok(
    Argon2::default()
      .hash_password(password.as_bytes(), &salt)?
      .to_string(),
  )
}

fn verify_password(password: &str, hash: &str) -> Result<(), ApiError> {
  let parsed = PasswordHash::new(hash).map_err(|_| ApiError::Unauthorized)?;
  Argon2::default()
    .verify_password(password.as_bytes(), &parsed)
    .map_err(|_| ApiError::Unauthorized)
}

/// The `(name, password)` pair from a Basic `Authorization` header, or
/// `None` when there is no header at all.
pub fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let encoded = value
    .to_str()
    .ok()
    .and_then(|v| v.strip_prefix("Basic "))
    .ok_or(ApiError::Unauthorized)?;
  let decoded = B64.decode(encoded.trim()).map_err(|_| ApiError::Unauthorized)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::Unauthorized)?;
  let (name, password) = creds.split_once(':').ok_or(ApiError::Unauthorized)?;
  Ok(Some((name.to_owned(), password.to_owned())))
}

impl<S, I> FromRequestParts<AppState<S, I>> for CurrentActor
where
  S: CatalogStore + 'static,
  I: SearchIndex + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S, I>,
  ) -> Result<Self, Self::Rejection> {
    let Some((name, password)) = basic_credentials(&parts.headers)? else {
      return Ok(CurrentActor(Actor::Anonymous));
    };

    // Users without a password cannot sign in over HTTP.
    let Some((user, Some(hash))) = state.catalog.credentials(&name).await? else {
      tracing::debug!(user = %name, "unknown user or no password");
      return Err(ApiError::Unauthorized);
    };
    verify_password(&password, &hash).inspect_err(|_| {
      tracing::debug!(user = %name, "password mismatch");
    })?;

    Ok(CurrentActor(state.catalog.actor_for(user).await?))
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use axum::http::HeaderValue;

  fn headers(value: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    headers
  }

  #[test]
  fn no_header_is_anonymous() {
    assert!(basic_credentials(&HeaderMap::new()).unwrap().is_none());
  }

  #[test]
  fn decodes_basic_credentials() {
    let value = format!("Basic {}", B64.encode("alice:s3:cret"));
    let (name, password) = basic_credentials(&headers(&value)).unwrap().unwrap();
    assert_eq!(name, "alice");
    assert_eq!(password, "s3:cret");
  }

  #[test]
  fn malformed_headers_are_unauthorized() {
    for value in ["Bearer abc", "Basic !!!not-base64!!!", &format!("Basic {}", B64.encode("nocolon"))] {
      assert!(
        matches!(basic_credentials(&headers(value)), Err(ApiError::Unauthorized)),
        "{value}"
      );
    }
  }

  #[test]
  fn hashes_verify() {
    let hash = hash_password("secret").unwrap();
    assert!(verify_password("secret", &hash).is_ok());
    assert!(verify_password("wrong", &hash).is_err());
  }
}
